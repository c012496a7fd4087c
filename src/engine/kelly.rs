/// Fractional Kelly stake sizing.
///
/// The desk sizes a bet from the value edge and the model's probability for
/// the chosen market:
///
///   fair_odds = 1 / p
///   f_raw     = edge / (fair_odds − 1)
///   f         = min(f_raw · kelly_fraction, max_stake_pct)
///   stake     = bankroll · f            (rounded to cents)
///
/// `edge` is a decimal fraction (0.068 for 6.8%). Edges at or below 2% are
/// sized at zero regardless of the caller's own threshold, so rounding noise
/// around the gate never turns into a stake.
use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::odds::round2;

/// Edges at or below this (as a fraction) are never staked.
pub const EDGE_FLOOR: f64 = 0.02;

/// Stake-sizing knobs handed to the engine core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Fractional Kelly multiplier (0.25 = quarter-Kelly).
    pub kelly_fraction: f64,
    /// Hard cap on stake as a fraction of bankroll.
    pub max_stake_pct: f64,
    /// Minimum edge, in percent, for the decision policy to bet at all.
    pub min_edge_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            kelly_fraction: 0.25,
            max_stake_pct: 0.05,
            min_edge_pct: 3.0,
        }
    }
}

/// Fraction of bankroll to stake, after the fractional multiplier and cap.
///
/// # Arguments
/// * `edge`             – value edge as a decimal fraction.
/// * `fair_probability` – model probability for the market, in (0, 1).
pub fn kelly_fraction(
    edge: f64,
    fair_probability: f64,
    config: &SizingConfig,
) -> Result<f64, EngineError> {
    if !edge.is_finite() {
        return Err(EngineError::StakeComputation(format!("edge is {}", edge)));
    }
    if edge <= EDGE_FLOOR {
        return Ok(0.0);
    }
    if !(fair_probability > 0.0 && fair_probability <= 1.0) {
        return Err(EngineError::StakeComputation(format!(
            "fair probability {} outside (0, 1]",
            fair_probability
        )));
    }

    let fair_odds = 1.0 / fair_probability;
    let net_odds = fair_odds - 1.0;
    if net_odds <= 0.0 {
        // p == 1 → fair odds of exactly 1.0, nothing to divide by
        return Err(EngineError::StakeComputation(format!(
            "fair odds {} leave no net payout",
            fair_odds
        )));
    }

    let raw = edge / net_odds;
    Ok((raw * config.kelly_fraction).min(config.max_stake_pct).max(0.0))
}

/// Currency stake for `bankroll`, rounded to 2 decimal places.
pub fn kelly_stake(
    edge: f64,
    fair_probability: f64,
    bankroll: f64,
    config: &SizingConfig,
) -> Result<f64, EngineError> {
    let fraction = kelly_fraction(edge, fair_probability, config)?;
    Ok(round2(bankroll * fraction))
}
