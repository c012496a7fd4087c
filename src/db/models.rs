use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::decision::StakeDecision;

/// Settlement of a paper trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Win,
    Lose,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Win => "WIN",
            TradeResult::Lose => "LOSE",
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WIN" => Ok(TradeResult::Win),
            "LOSE" => Ok(TradeResult::Lose),
            other => anyhow::bail!("unknown trade result '{}'", other),
        }
    }
}

/// One settled paper trade. Append-only: never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Display id, e.g. `TRADE_0007`
    pub id: String,
    /// 1-based position in the ledger
    pub seq: u64,
    /// "Home vs Away"
    pub match_name: String,
    /// Decision as it stood when the trade was placed
    #[serde(flatten)]
    pub decision: StakeDecision,
    pub result: TradeResult,
    /// Signed P&L, rounded to cents
    pub profit: f64,
    pub bankroll_before: f64,
    pub bankroll_after: f64,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    pub fn format_id(seq: u64) -> String {
        format!("TRADE_{:04}", seq)
    }
}
