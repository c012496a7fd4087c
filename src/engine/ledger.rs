//! Process-wide bankroll and append-only trade ledger.
//!
//! Bankroll and trades sit behind one mutex, so "read bankroll → compute
//! profit → append trade → write bankroll" is a single critical section and
//! readers always see both sides of a trade or neither. The bankroll is never
//! stored on its own: at startup it is rebuilt by replaying trade profits
//! from the configured initial value.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::db::models::{Trade, TradeResult};
use crate::db::Database;

use super::decision::StakeDecision;
use super::error::EngineError;
use super::odds::round2;

#[derive(Debug)]
struct LedgerState {
    bankroll: f64,
    trades: Vec<Trade>,
}

/// Point-in-time copy of the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub initial_bankroll: f64,
    pub bankroll: f64,
    pub trades: Vec<Trade>,
}

pub struct Ledger {
    initial_bankroll: f64,
    state: Mutex<LedgerState>,
    db: Option<Database>,
}

impl Ledger {
    /// In-memory ledger with no persistence.
    pub fn new(initial_bankroll: f64) -> Self {
        Ledger {
            initial_bankroll,
            state: Mutex::new(LedgerState {
                bankroll: initial_bankroll,
                trades: Vec::new(),
            }),
            db: None,
        }
    }

    /// Ledger backed by `db`, replaying every stored trade.
    ///
    /// Fails if the stored rows do not chain: each trade's `bankroll_before`
    /// must equal the running bankroll and its ids must be sequential.
    pub fn open(initial_bankroll: f64, db: Database) -> Result<Self> {
        let trades = db.list_trades()?;
        let bankroll = replay(initial_bankroll, &trades)?;
        if !trades.is_empty() {
            info!(
                "Replayed {} trade(s): bankroll ${:.2} → ${:.2}",
                trades.len(),
                initial_bankroll,
                bankroll
            );
        }
        Ok(Ledger {
            initial_bankroll,
            state: Mutex::new(LedgerState { bankroll, trades }),
            db: Some(db),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // State is only written after every fallible step has succeeded, so a
        // poisoned guard still holds a consistent ledger.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn initial_bankroll(&self) -> f64 {
        self.initial_bankroll
    }

    pub fn bankroll(&self) -> f64 {
        self.lock().bankroll
    }

    pub fn len(&self) -> usize {
        self.lock().trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.lock().trades.clone()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.lock();
        LedgerSnapshot {
            initial_bankroll: self.initial_bankroll,
            bankroll: state.bankroll,
            trades: state.trades.clone(),
        }
    }

    /// Settle `decision` with `result` and append the trade.
    ///
    /// WIN pays `stake · (book_odds − 1)`, LOSE costs the stake. The new
    /// bankroll is visible to every reader once this returns. If persistence
    /// fails nothing is recorded.
    pub fn record(
        &self,
        match_name: &str,
        decision: &StakeDecision,
        result: TradeResult,
    ) -> Result<Trade, EngineError> {
        let profit = match result {
            TradeResult::Win => round2(decision.stake_amount * (decision.book_odds - 1.0)),
            TradeResult::Lose => -decision.stake_amount,
        };

        let mut state = self.lock();
        let seq = state.trades.len() as u64 + 1;
        let bankroll_before = state.bankroll;
        let trade = Trade {
            id: Trade::format_id(seq),
            seq,
            match_name: match_name.to_string(),
            decision: decision.clone(),
            result,
            profit,
            bankroll_before,
            bankroll_after: bankroll_before + profit,
            executed_at: Utc::now(),
        };

        if let Some(db) = &self.db {
            db.insert_trade(&trade)
                .map_err(|e| EngineError::Ledger(format!("{:#}", e)))?;
        }
        state.bankroll = trade.bankroll_after;
        state.trades.push(trade.clone());
        Ok(trade)
    }
}

/// Rebuild the bankroll from `initial` by applying each trade's profit in
/// order, checking the stored chain as it goes.
pub fn replay(initial: f64, trades: &[Trade]) -> Result<f64> {
    let mut bankroll = initial;
    for (idx, trade) in trades.iter().enumerate() {
        let expected_seq = idx as u64 + 1;
        if trade.seq != expected_seq {
            anyhow::bail!(
                "ledger gap: expected trade #{}, found #{} ({})",
                expected_seq,
                trade.seq,
                trade.id
            );
        }
        if trade.bankroll_before != bankroll {
            anyhow::bail!(
                "ledger replay mismatch at {}: stored bankroll_before {:.2}, replayed {:.2}",
                trade.id,
                trade.bankroll_before,
                bankroll
            );
        }
        bankroll += trade.profit;
        if trade.bankroll_after != bankroll {
            anyhow::bail!(
                "ledger replay mismatch at {}: stored bankroll_after {:.2}, replayed {:.2}",
                trade.id,
                trade.bankroll_after,
                bankroll
            );
        }
    }
    Ok(bankroll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::odds::Market;
    use approx::assert_relative_eq;
    use std::thread;

    fn bet(stake: f64, book_odds: f64) -> StakeDecision {
        StakeDecision {
            market: Market::Home,
            edge_pct: 10.0,
            fair_odds: book_odds * 1.1,
            book_odds,
            probability: 0.5,
            stake_amount: stake,
            stake_pct_of_bankroll: stake / 100.0,
            confidence: 0.5,
        }
    }

    #[test]
    fn win_and_loss_update_bankroll() {
        let ledger = Ledger::new(10_000.0);
        let t1 = ledger.record("A vs B", &bet(200.0, 2.5), TradeResult::Win).unwrap();
        assert_relative_eq!(t1.profit, 300.0, epsilon = 1e-9);
        assert_eq!(t1.bankroll_before, 10_000.0);
        assert_eq!(t1.bankroll_after, 10_300.0);

        let t2 = ledger.record("C vs D", &bet(150.0, 3.0), TradeResult::Lose).unwrap();
        assert_eq!(t2.id, "TRADE_0002");
        assert_eq!(t2.profit, -150.0);
        assert_eq!(t2.bankroll_before, t1.bankroll_after);
        assert_eq!(ledger.bankroll(), 10_150.0);
    }

    #[test]
    fn replay_reproduces_final_bankroll() {
        let ledger = Ledger::new(10_000.0);
        let outcomes = [TradeResult::Win, TradeResult::Lose, TradeResult::Lose, TradeResult::Win];
        for (i, r) in outcomes.iter().enumerate() {
            ledger
                .record("X vs Y", &bet(47.81 + i as f64, 1.93), *r)
                .unwrap();
        }
        let snap = ledger.snapshot();
        for t in &snap.trades {
            assert_eq!(t.bankroll_after, t.bankroll_before + t.profit);
        }
        assert_eq!(replay(10_000.0, &snap.trades).unwrap(), snap.bankroll);
    }

    #[test]
    fn replay_detects_broken_chain() {
        let ledger = Ledger::new(1_000.0);
        ledger.record("A vs B", &bet(10.0, 2.0), TradeResult::Win).unwrap();
        let mut trades = ledger.trades();
        trades[0].bankroll_before = 999.0;
        assert!(replay(1_000.0, &trades).is_err());
    }

    #[test]
    fn persisted_ledger_reopens_with_same_bankroll() {
        let db = Database::open(":memory:").unwrap();
        let ledger = Ledger::open(5_000.0, db.clone()).unwrap();
        ledger.record("A vs B", &bet(100.0, 2.2), TradeResult::Win).unwrap();
        ledger.record("C vs D", &bet(80.0, 3.1), TradeResult::Lose).unwrap();
        let expected = ledger.bankroll();

        let reopened = Ledger::open(5_000.0, db).unwrap();
        assert_eq!(reopened.bankroll(), expected);
        assert_eq!(reopened.len(), 2);
        let next = reopened
            .record("E vs F", &bet(10.0, 2.0), TradeResult::Lose)
            .unwrap();
        assert_eq!(next.id, "TRADE_0003");
    }

    #[test]
    fn concurrent_records_lose_no_updates() {
        let ledger = Ledger::new(10_000.0);
        let workers = 8;
        let per_worker = 50;

        thread::scope(|s| {
            for w in 0..workers {
                let ledger = &ledger;
                s.spawn(move || {
                    for i in 0..per_worker {
                        let result = if (w + i) % 3 == 0 {
                            TradeResult::Lose
                        } else {
                            TradeResult::Win
                        };
                        // stakes and odds chosen so every profit is exact in binary
                        ledger
                            .record("Concurrent", &bet(64.0 + w as f64, 1.5), result)
                            .unwrap();
                    }
                });
            }
        });

        let snap = ledger.snapshot();
        assert_eq!(snap.trades.len(), workers * per_worker);
        let total: f64 = snap.trades.iter().map(|t| t.profit).sum();
        assert_eq!(snap.bankroll, 10_000.0 + total);
        for (i, t) in snap.trades.iter().enumerate() {
            assert_eq!(t.seq, i as u64 + 1);
            assert_eq!(t.bankroll_after, t.bankroll_before + t.profit);
        }
        for pair in snap.trades.windows(2) {
            assert_eq!(pair[1].bankroll_before, pair[0].bankroll_after);
        }
    }
}
