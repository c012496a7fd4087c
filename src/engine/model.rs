//! 1X2 outcome model.
//!
//! A fixed, hand-tuned logistic heuristic, not a fitted model:
//!
//! ```text
//! score  = 0.3·Δxg + 0.2·Δrank + 0.1·Δform
//! p_home = σ(score)
//! p_draw = 0.25 · (1 − |p_home − (1 − p_home)|)
//! p_away = 1 − p_home − p_draw
//! ```
//!
//! Draws peak when the sides are level (p_home ≈ 0.5) and shrink as one side
//! dominates. The three values are renormalised to absorb floating drift.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::features::MatchFeatures;
use super::odds::Market;

const XG_WEIGHT: f64 = 0.3;
const RANK_WEIGHT: f64 = 0.2;
const FORM_WEIGHT: f64 = 0.1;
/// Draw share when both sides are exactly even.
const DRAW_PEAK: f64 = 0.25;
const MAX_CONFIDENCE: f64 = 0.95;
/// Drift below zero smaller than this is treated as zero.
const NEGATIVE_TOLERANCE: f64 = 1e-12;

/// Home/draw/away probabilities; each in [0, 1], summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl ProbabilityDistribution {
    pub fn get(&self, market: Market) -> f64 {
        match market {
            Market::Home => self.home,
            Market::Draw => self.draw,
            Market::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub score: f64,
    pub probabilities: ProbabilityDistribution,
    /// Capped, monotonic proxy for model certainty. Not a calibrated probability.
    pub confidence: f64,
}

/// Evaluate the outcome model for one match.
pub fn predict(features: &MatchFeatures) -> Result<ModelOutput, EngineError> {
    let score = XG_WEIGHT * features.delta_xg
        + RANK_WEIGHT * features.delta_rank
        + FORM_WEIGHT * features.delta_form;
    if !score.is_finite() {
        return Err(EngineError::ModelDegenerate(format!(
            "non-finite score from features {:?}",
            features
        )));
    }

    let p_home = sigmoid(score);
    let p_draw = DRAW_PEAK * (1.0 - (p_home - (1.0 - p_home)).abs());
    let p_away = 1.0 - p_home - p_draw;

    let probabilities = normalize(p_home, p_draw, p_away)?;
    let confidence = (score.abs() * 2.0).min(MAX_CONFIDENCE);

    Ok(ModelOutput {
        score,
        probabilities,
        confidence,
    })
}

/// Divide each value by the raw sum and clamp into [0, 1]. Rejects inputs
/// that are meaningfully negative or cannot be normalised.
fn normalize(home: f64, draw: f64, away: f64) -> Result<ProbabilityDistribution, EngineError> {
    let mut raw = [home, draw, away];
    for (market, p) in Market::ALL.iter().zip(raw.iter_mut()) {
        if !p.is_finite() || *p < -NEGATIVE_TOLERANCE {
            return Err(EngineError::ModelDegenerate(format!(
                "raw {} probability {} outside [0, 1]",
                market, p
            )));
        }
        *p = p.max(0.0);
    }

    let total: f64 = raw.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(EngineError::ModelDegenerate(format!(
            "probabilities sum to {}",
            total
        )));
    }

    let [home, draw, away] = raw.map(|p| (p / total).clamp(0.0, 1.0));
    let dist = ProbabilityDistribution { home, draw, away };
    debug_assert!((dist.sum() - 1.0).abs() <= 1e-9);
    Ok(dist)
}

/// Standard logistic sigmoid function.
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
