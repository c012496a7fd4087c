//! Fair-odds conversion and edge detection against bookmaker prices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::error::EngineError;
use super::model::ProbabilityDistribution;

/// Overround baked into fair odds: 1 / (p * 0.945) ≈ a 5.5% bookmaker margin.
pub const FAIR_ODDS_MARGIN: f64 = 0.945;

/// 1X2 market. Declaration order is the tie-break order for edge selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Home,
    Draw,
    Away,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Home, Market::Draw, Market::Away];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Home => "home",
            Market::Draw => "draw",
            Market::Away => "away",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-implied decimal odds, margin included, rounded to 2 dp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl FairOdds {
    pub fn get(&self, market: Market) -> f64 {
        match market {
            Market::Home => self.home,
            Market::Draw => self.draw,
            Market::Away => self.away,
        }
    }
}

/// Bookmaker decimal odds. A missing entry means the market was not quoted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BookOdds {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

impl BookOdds {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        BookOdds {
            home: Some(home),
            draw: Some(draw),
            away: Some(away),
        }
    }

    pub fn get(&self, market: Market) -> Option<f64> {
        match market {
            Market::Home => self.home,
            Market::Draw => self.draw,
            Market::Away => self.away,
        }
    }

    pub fn is_empty(&self) -> bool {
        Market::ALL.iter().all(|m| self.get(*m).is_none())
    }

    /// Every quoted price must be a finite decimal above 1.0, and at least
    /// one market must be quoted.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.is_empty() {
            return Err(EngineError::BookOddsUnavailable(
                "no market quoted".into(),
            ));
        }
        for market in Market::ALL {
            if let Some(value) = self.get(market) {
                if !value.is_finite() || value <= 1.0 {
                    return Err(EngineError::InvalidBookOdds { market, value });
                }
            }
        }
        Ok(())
    }
}

/// Value edge in percent per market. Markets without a bookmaker price are
/// absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeSet(BTreeMap<Market, f64>);

impl EdgeSet {
    pub fn get(&self, market: Market) -> Option<f64> {
        self.0.get(&market).copied()
    }

    /// Market with the strictly largest edge; ties go to the earlier market
    /// in `home, draw, away` order.
    pub fn best(&self) -> Option<(Market, f64)> {
        let mut best: Option<(Market, f64)> = None;
        for (market, edge) in &self.0 {
            match best {
                Some((_, top)) if *edge <= top => {}
                _ => best = Some((*market, *edge)),
            }
        }
        best
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Convert probabilities to margin-adjusted fair odds.
///
/// A zero probability has no finite fair price; that is reported as
/// `ModelDegenerate` instead of producing infinity.
pub fn fair_odds(probs: &ProbabilityDistribution) -> Result<FairOdds, EngineError> {
    let price = |market: Market| -> Result<f64, EngineError> {
        let p = probs.get(market);
        if p.is_nan() || p <= 0.0 {
            return Err(EngineError::ModelDegenerate(format!(
                "{} probability is {}, fair odds undefined",
                market, p
            )));
        }
        Ok(round2(1.0 / (p * FAIR_ODDS_MARGIN)))
    };
    Ok(FairOdds {
        home: price(Market::Home)?,
        draw: price(Market::Draw)?,
        away: price(Market::Away)?,
    })
}

/// Per-market edge: `max(0, (fair - book) / book * 100)`, rounded to 2 dp.
/// Negative edges are floored at zero; the desk never backs a price below fair.
pub fn detect_edges(fair: &FairOdds, book: &BookOdds) -> EdgeSet {
    let mut edges = BTreeMap::new();
    for market in Market::ALL {
        let Some(book_price) = book.get(market) else {
            continue;
        };
        let fair_price = fair.get(market);
        let edge = if fair_price > book_price {
            round2((fair_price - book_price) / book_price * 100.0)
        } else {
            0.0
        };
        edges.insert(market, edge);
    }
    EdgeSet(edges)
}
