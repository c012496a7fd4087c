//! Ledger performance analytics.
//! Pure: takes a trade snapshot and returns computed values, never touches
//! the live ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::models::{Trade, TradeResult};

use super::error::EngineError;
use super::odds::{round2, Market};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_rate: f64,
    pub total_staked: f64,
    pub total_profit: f64,
    /// `total_profit / total_staked · 100`, 0 when nothing was staked.
    pub roi_pct: f64,
    pub final_bankroll: f64,
    /// Running sum of profit, in ledger order.
    pub cumulative_profit: Vec<f64>,
    /// Running max of `cumulative_profit`.
    pub peak: Vec<f64>,
    /// `cumulative_profit[i] − peak[i]`, always ≤ 0.
    pub drawdown: Vec<f64>,
    /// Worst drawdown; 0 when cumulative profit never fell.
    pub max_drawdown: f64,
    /// `bankroll_after` per trade.
    pub bankroll: Vec<f64>,
    pub bets_by_market: BTreeMap<Market, usize>,
}

/// Aggregate a ledger snapshot. An empty ledger has no defined win rate
/// and is reported as `EmptyLedger`.
pub fn analyze(trades: &[Trade]) -> Result<PerformanceReport, EngineError> {
    if trades.is_empty() {
        return Err(EngineError::EmptyLedger);
    }

    let total_trades = trades.len();
    let winning_trades = trades
        .iter()
        .filter(|t| t.result == TradeResult::Win)
        .count();
    let total_staked: f64 = trades.iter().map(|t| t.decision.stake_amount).sum();
    let total_profit: f64 = trades.iter().map(|t| t.profit).sum();
    let roi_pct = if total_staked > 0.0 {
        total_profit / total_staked * 100.0
    } else {
        0.0
    };

    let mut cumulative_profit = Vec::with_capacity(total_trades);
    let mut peak = Vec::with_capacity(total_trades);
    let mut drawdown = Vec::with_capacity(total_trades);
    let mut running = 0.0;
    let mut high = f64::NEG_INFINITY;
    for t in trades {
        running += t.profit;
        high = high.max(running);
        cumulative_profit.push(running);
        peak.push(high);
        drawdown.push(running - high);
    }
    let max_drawdown = drawdown.iter().copied().fold(0.0, f64::min);

    let mut bets_by_market = BTreeMap::new();
    for t in trades {
        *bets_by_market.entry(t.decision.market).or_insert(0) += 1;
    }

    Ok(PerformanceReport {
        total_trades,
        winning_trades,
        win_rate: winning_trades as f64 / total_trades as f64,
        total_staked: round2(total_staked),
        total_profit: round2(total_profit),
        roi_pct: round2(roi_pct),
        final_bankroll: trades[total_trades - 1].bankroll_after,
        cumulative_profit,
        peak,
        drawdown,
        max_drawdown,
        bankroll: trades.iter().map(|t| t.bankroll_after).collect(),
        bets_by_market,
    })
}
