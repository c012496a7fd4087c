use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::engine::decision::StakeDecision;
use crate::engine::odds::Market;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    /// `:memory:` gives a throwaway in-process database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoned guard still holds a consistent connection; rusqlite
        // statements are atomic.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Trades ────────────────────────────────────────────────────────────────

    /// Append a settled trade. Rows are never updated or deleted.
    pub fn insert_trade(&self, trade: &Trade) -> Result<()> {
        let conn = self.lock();
        let d = &trade.decision;
        conn.execute(
            "INSERT INTO trades (
                seq, trade_id, match_name, market, edge_pct, fair_odds, book_odds,
                probability, stake_amount, stake_pct, confidence, result,
                profit, bankroll_before, bankroll_after, executed_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
            params![
                trade.seq as i64,
                trade.id,
                trade.match_name,
                d.market.as_str(),
                d.edge_pct,
                d.fair_odds,
                d.book_odds,
                d.probability,
                d.stake_amount,
                d.stake_pct_of_bankroll,
                d.confidence,
                trade.result.as_str(),
                trade.profit,
                trade.bankroll_before,
                trade.bankroll_after,
                trade.executed_at,
            ],
        )
        .with_context(|| format!("Failed to insert {}", trade.id))?;
        Ok(())
    }

    /// All trades in ledger order.
    pub fn list_trades(&self) -> Result<Vec<Trade>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT seq, trade_id, match_name, market, edge_pct, fair_odds, book_odds,
                    probability, stake_amount, stake_pct, confidence, result,
                    profit, bankroll_before, bankroll_after, executed_at
             FROM trades ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map([], map_trade_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(TradeRow::into_trade).collect()
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

/// Raw column values; enum columns are validated in `into_trade`.
struct TradeRow {
    seq: i64,
    trade_id: String,
    match_name: String,
    market: String,
    edge_pct: f64,
    fair_odds: f64,
    book_odds: f64,
    probability: f64,
    stake_amount: f64,
    stake_pct: f64,
    confidence: f64,
    result: String,
    profit: f64,
    bankroll_before: f64,
    bankroll_after: f64,
    executed_at: chrono::DateTime<chrono::Utc>,
}

fn map_trade_row(row: &rusqlite::Row) -> rusqlite::Result<TradeRow> {
    Ok(TradeRow {
        seq: row.get(0)?,
        trade_id: row.get(1)?,
        match_name: row.get(2)?,
        market: row.get(3)?,
        edge_pct: row.get(4)?,
        fair_odds: row.get(5)?,
        book_odds: row.get(6)?,
        probability: row.get(7)?,
        stake_amount: row.get(8)?,
        stake_pct: row.get(9)?,
        confidence: row.get(10)?,
        result: row.get(11)?,
        profit: row.get(12)?,
        bankroll_before: row.get(13)?,
        bankroll_after: row.get(14)?,
        executed_at: row.get(15)?,
    })
}

impl TradeRow {
    fn into_trade(self) -> Result<Trade> {
        let market = match self.market.as_str() {
            "home" => Market::Home,
            "draw" => Market::Draw,
            "away" => Market::Away,
            other => anyhow::bail!("unknown market '{}' in {}", other, self.trade_id),
        };
        Ok(Trade {
            id: self.trade_id,
            seq: u64::try_from(self.seq).context("negative trade seq")?,
            match_name: self.match_name,
            decision: StakeDecision {
                market,
                edge_pct: self.edge_pct,
                fair_odds: self.fair_odds,
                book_odds: self.book_odds,
                probability: self.probability,
                stake_amount: self.stake_amount,
                stake_pct_of_bankroll: self.stake_pct,
                confidence: self.confidence,
            },
            result: self.result.parse()?,
            profit: self.profit,
            bankroll_before: self.bankroll_before,
            bankroll_after: self.bankroll_after,
            executed_at: self.executed_at,
        })
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    seq             INTEGER PRIMARY KEY,
    trade_id        TEXT    NOT NULL UNIQUE,
    match_name      TEXT    NOT NULL,
    market          TEXT    NOT NULL,
    edge_pct        REAL    NOT NULL,
    fair_odds       REAL    NOT NULL,
    book_odds       REAL    NOT NULL,
    probability     REAL    NOT NULL,
    stake_amount    REAL    NOT NULL,
    stake_pct       REAL    NOT NULL,
    confidence      REAL    NOT NULL,
    result          TEXT    NOT NULL,
    profit          REAL    NOT NULL,
    bankroll_before REAL    NOT NULL,
    bankroll_after  REAL    NOT NULL,
    executed_at     TEXT    NOT NULL
);
"#;
