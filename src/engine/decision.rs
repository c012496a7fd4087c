//! Decision policy: model → fair odds → edges → stake.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::EngineError;
use super::features::MatchFeatures;
use super::kelly::{kelly_stake, SizingConfig};
use super::model::{predict, ProbabilityDistribution};
use super::odds::{detect_edges, fair_odds, round2, BookOdds, EdgeSet, FairOdds, Market};

/// Sized recommendation for the best-edge market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeDecision {
    pub market: Market,
    pub edge_pct: f64,
    pub fair_odds: f64,
    pub book_odds: f64,
    pub probability: f64,
    pub stake_amount: f64,
    pub stake_pct_of_bankroll: f64,
    pub confidence: f64,
}

/// Outcome of the decision policy. `NoBet` is a normal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Bet(StakeDecision),
    NoBet {
        /// Largest edge seen across quoted markets; 0 when none was positive.
        max_edge: f64,
    },
}

/// Everything computed for one match, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub probabilities: ProbabilityDistribution,
    pub fair_odds: FairOdds,
    pub edges: EdgeSet,
    pub confidence: f64,
    pub decision: Decision,
}

/// Run the full pricing and sizing chain against a bankroll snapshot.
///
/// Bets only when the best edge reaches `min_edge_pct` and Kelly sizes a
/// positive stake.
pub fn evaluate(
    features: &MatchFeatures,
    book: &BookOdds,
    bankroll: f64,
    config: &SizingConfig,
) -> Result<Evaluation, EngineError> {
    book.validate()?;

    let output = predict(features)?;
    let fair = fair_odds(&output.probabilities)?;
    let edges = detect_edges(&fair, book);

    let decision = match edges.best() {
        Some((market, edge_pct)) if edge_pct >= config.min_edge_pct => {
            let probability = output.probabilities.get(market);
            let stake = kelly_stake(edge_pct / 100.0, probability, bankroll, config)?;
            // quoted markets are exactly the keys of `edges`
            let book_price = book.get(market).ok_or_else(|| {
                EngineError::BookOddsUnavailable(format!("{} not quoted", market))
            })?;
            if stake > 0.0 {
                Decision::Bet(StakeDecision {
                    market,
                    edge_pct,
                    fair_odds: fair.get(market),
                    book_odds: book_price,
                    probability,
                    stake_amount: stake,
                    stake_pct_of_bankroll: if bankroll > 0.0 {
                        round2(stake / bankroll * 100.0)
                    } else {
                        0.0
                    },
                    confidence: round2(output.confidence),
                })
            } else {
                debug!("Edge {:.2}% on {} sized to zero stake", edge_pct, market);
                Decision::NoBet { max_edge: edge_pct }
            }
        }
        Some((market, edge_pct)) => {
            debug!(
                "Best edge {:.2}% on {} below {:.2}% threshold",
                edge_pct, market, config.min_edge_pct
            );
            Decision::NoBet { max_edge: edge_pct }
        }
        None => Decision::NoBet { max_edge: 0.0 },
    };

    Ok(Evaluation {
        score: output.score,
        probabilities: output.probabilities,
        fair_odds: fair,
        edges,
        confidence: output.confidence,
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::features::MatchAttributes;
    use approx::assert_relative_eq;

    fn default_features() -> MatchFeatures {
        MatchFeatures::from_attributes(&MatchAttributes::default())
    }

    #[test]
    fn defaults_against_standard_book_bet_the_draw() {
        let cfg = SizingConfig::default();
        let eval = evaluate(
            &default_features(),
            &BookOdds::new(1.80, 3.50, 4.20),
            10_000.0,
            &cfg,
        )
        .unwrap();

        assert_relative_eq!(eval.fair_odds.home, 1.46, epsilon = 1e-12);
        assert_relative_eq!(eval.fair_odds.draw, 7.70, epsilon = 1e-12);
        assert_relative_eq!(eval.fair_odds.away, 7.70, epsilon = 1e-12);
        assert_eq!(eval.edges.get(Market::Home), Some(0.0));

        let Decision::Bet(bet) = eval.decision else {
            panic!("expected a bet, got {:?}", eval.decision);
        };
        assert_eq!(bet.market, Market::Draw);
        assert_relative_eq!(bet.edge_pct, 120.0, epsilon = 1e-9);
        assert_relative_eq!(bet.book_odds, 3.50, epsilon = 1e-12);
        assert_relative_eq!(bet.stake_amount, 478.02, epsilon = 1e-9);
        assert!(bet.stake_amount <= 0.05 * 10_000.0);
        assert_relative_eq!(bet.stake_pct_of_bankroll, 4.78, epsilon = 1e-9);
        assert_relative_eq!(bet.confidence, 0.95, epsilon = 1e-12);
    }

    #[test]
    fn book_at_or_above_fair_gives_no_bet_with_zero_edge() {
        let eval = evaluate(
            &default_features(),
            &BookOdds::new(1.50, 7.70, 8.00),
            10_000.0,
            &SizingConfig::default(),
        )
        .unwrap();
        assert_eq!(eval.decision, Decision::NoBet { max_edge: 0.0 });
    }

    #[test]
    fn edge_below_threshold_reports_max_edge() {
        // fair draw 7.70 vs book 7.55 → 1.99%
        let eval = evaluate(
            &default_features(),
            &BookOdds::new(1.50, 7.55, 7.70),
            10_000.0,
            &SizingConfig::default(),
        )
        .unwrap();
        assert_eq!(eval.decision, Decision::NoBet { max_edge: 1.99 });
    }

    #[test]
    fn only_quoted_markets_are_considered() {
        let book = BookOdds {
            home: Some(1.30),
            draw: None,
            away: Some(5.00),
        };
        let eval = evaluate(&default_features(), &book, 10_000.0, &SizingConfig::default()).unwrap();
        let Decision::Bet(bet) = eval.decision else {
            panic!("expected a bet");
        };
        assert_eq!(bet.market, Market::Away);
        assert!(eval.edges.get(Market::Draw).is_none());
    }

    #[test]
    fn missing_book_odds_is_an_error() {
        let err = evaluate(
            &default_features(),
            &BookOdds::default(),
            10_000.0,
            &SizingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::BookOddsUnavailable(_)));
    }

    #[test]
    fn degenerate_model_surfaces_before_sizing() {
        let err = evaluate(
            &MatchFeatures::new(0.0, 1000.0, 0.0),
            &BookOdds::new(1.01, 3.5, 4.2),
            10_000.0,
            &SizingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ModelDegenerate(_)));
    }

    #[test]
    fn decision_serialises_with_action_tag() {
        let json = serde_json::to_value(Decision::NoBet { max_edge: 0.0 }).unwrap();
        assert_eq!(json["action"], "NO_BET");
        assert_eq!(json["max_edge"], 0.0);
    }
}
