//! Match attributes → model features.
//!
//! Upstream parsing is best-effort: any attribute may be missing. Rather than
//! scattering fallbacks through the model, every default lives in one table
//! ([`DEFAULTS`]) and is applied here, once.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw per-team attributes as read from a match report. `None` means the
/// report did not carry the value (or it could not be parsed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAttributes {
    pub xg_home: Option<f64>,
    pub xg_away: Option<f64>,
    /// League table position (1 = top).
    pub rank_home: Option<u32>,
    pub rank_away: Option<u32>,
    /// Recent form on a 0–1 scale.
    pub form_home: Option<f64>,
    pub form_away: Option<f64>,
}

/// Defaults applied per attribute when the report does not provide one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeDefaults {
    pub xg_home: f64,
    pub xg_away: f64,
    pub rank_home: u32,
    pub rank_away: u32,
    pub form_home: f64,
    pub form_away: f64,
}

pub const DEFAULTS: AttributeDefaults = AttributeDefaults {
    xg_home: 1.5,
    xg_away: 1.0,
    rank_home: 8,
    rank_away: 12,
    form_home: 0.6,
    form_away: 0.4,
};

/// Home-minus-away deltas fed to the outcome model. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchFeatures {
    pub delta_xg: f64,
    /// Positive when the home side sits higher in the table.
    pub delta_rank: f64,
    pub delta_form: f64,
}

impl MatchFeatures {
    pub fn new(delta_xg: f64, delta_rank: f64, delta_form: f64) -> Self {
        MatchFeatures {
            delta_xg,
            delta_rank,
            delta_form,
        }
    }

    /// Build features from parsed attributes, filling gaps from [`DEFAULTS`].
    pub fn from_attributes(attrs: &MatchAttributes) -> Self {
        let xg_home = or_default("xg_home", attrs.xg_home, DEFAULTS.xg_home);
        let xg_away = or_default("xg_away", attrs.xg_away, DEFAULTS.xg_away);
        let rank_home = or_default("rank_home", attrs.rank_home, DEFAULTS.rank_home);
        let rank_away = or_default("rank_away", attrs.rank_away, DEFAULTS.rank_away);
        let form_home = or_default("form_home", attrs.form_home, DEFAULTS.form_home);
        let form_away = or_default("form_away", attrs.form_away, DEFAULTS.form_away);

        // Lower table position is stronger, so the delta runs away - home.
        let delta_rank = rank_away as f64 - rank_home as f64;

        MatchFeatures::new(xg_home - xg_away, delta_rank, form_home - form_away)
    }
}

fn or_default<T: Copy + std::fmt::Debug>(name: &str, value: Option<T>, default: T) -> T {
    match value {
        Some(v) => v,
        None => {
            debug!("{} missing from report, using default {:?}", name, default);
            default
        }
    }
}
