use thiserror::Error;

use super::odds::Market;

/// Failures raised by the decision & analytics engine.
///
/// `NO_BET` is a normal outcome and never appears here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A parsed attribute could not be read. Absorbed by the feature
    /// extractor, which falls back to the documented default.
    #[error("feature extraction failed for '{attribute}': {reason}")]
    FeatureExtraction { attribute: String, reason: String },

    #[error("model degenerate: {0}")]
    ModelDegenerate(String),

    #[error("bookmaker odds unavailable: {0}")]
    BookOddsUnavailable(String),

    #[error("invalid bookmaker odds for {market}: {value} (must be a finite decimal > 1.0)")]
    InvalidBookOdds { market: Market, value: f64 },

    #[error("stake computation failed: {0}")]
    StakeComputation(String),

    #[error("no trades in ledger")]
    EmptyLedger,

    #[error("ledger append failed: {0}")]
    Ledger(String),
}

impl EngineError {
    /// Stable machine-readable kind, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::FeatureExtraction { .. } => "feature_extraction",
            EngineError::ModelDegenerate(_) => "model_degenerate",
            EngineError::BookOddsUnavailable(_) => "book_odds_unavailable",
            EngineError::InvalidBookOdds { .. } => "invalid_book_odds",
            EngineError::StakeComputation(_) => "stake_computation",
            EngineError::EmptyLedger => "empty_ledger",
            EngineError::Ledger(_) => "ledger",
        }
    }
}
