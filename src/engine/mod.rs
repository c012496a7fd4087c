pub mod decision;
pub mod error;
pub mod features;
pub mod kelly;
pub mod ledger;
pub mod model;
pub mod odds;
pub mod performance;
pub mod simulator;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::models::Trade;
use crate::intake::{parse_report, OcrOdds, OddsReader};

use decision::{evaluate, Decision, Evaluation};
use error::EngineError;
use features::MatchFeatures;
use kelly::SizingConfig;
use ledger::Ledger;
use model::ProbabilityDistribution;
use odds::{BookOdds, EdgeSet, FairOdds};
use performance::PerformanceReport;
use simulator::TradeSimulator;

/// Result of one `analyze_match` call.
#[derive(Debug, Clone, Serialize)]
pub struct MatchAnalysis {
    pub match_name: String,
    pub book_odds: BookOdds,
    pub probabilities: ProbabilityDistribution,
    pub fair_odds: FairOdds,
    pub edges: EdgeSet,
    pub confidence: f64,
    pub decision: Decision,
    /// Settled paper trade, present only for BET decisions.
    pub trade: Option<Trade>,
    pub timestamp: DateTime<Utc>,
}

/// Decision pipeline bound to one shared ledger.
///
/// Every analysis prices against the bankroll at the moment it is decided;
/// settlement then runs inside the ledger's critical section.
pub struct Engine {
    sizing: SizingConfig,
    ledger: Arc<Ledger>,
    simulator: TradeSimulator,
    odds_reader: Option<Arc<dyn OddsReader>>,
}

impl Engine {
    pub fn new(
        sizing: SizingConfig,
        ledger: Arc<Ledger>,
        simulator: TradeSimulator,
        odds_reader: Option<Arc<dyn OddsReader>>,
    ) -> Self {
        Engine {
            sizing,
            ledger,
            simulator,
            odds_reader,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Parse a report (and optional odds screenshot), decide, and paper-trade
    /// any BET.
    ///
    /// Screenshot odds take precedence over odds found in the text. If neither
    /// source yields prices the call fails with `BookOddsUnavailable`.
    pub async fn analyze_match(
        &self,
        text: &str,
        image: Option<&[u8]>,
    ) -> Result<MatchAnalysis, EngineError> {
        let mut report = parse_report(text);

        let mut ocr_failure = None;
        let mut book = None;
        if let Some(image) = image {
            match self.read_screenshot(image).await {
                Ok(ocr) => {
                    if !report.teams_found {
                        if let (Some(h), Some(a)) = (ocr.home_team.clone(), ocr.away_team.clone())
                        {
                            report.home_team = h;
                            report.away_team = a;
                        }
                    }
                    book = Some(ocr.book_odds());
                }
                Err(reason) => {
                    warn!("Screenshot odds unavailable: {}", reason);
                    ocr_failure = Some(reason);
                }
            }
        }

        let book = book.or(report.book_odds).ok_or_else(|| {
            EngineError::BookOddsUnavailable(
                ocr_failure.unwrap_or_else(|| "no odds found in report".to_string()),
            )
        })?;

        let features = MatchFeatures::from_attributes(&report.attributes);
        let match_name = report.match_name();
        let (evaluation, trade) = self.decide(&match_name, &features, &book)?;

        Ok(MatchAnalysis {
            match_name,
            book_odds: book,
            probabilities: evaluation.probabilities,
            fair_odds: evaluation.fair_odds,
            edges: evaluation.edges,
            confidence: evaluation.confidence,
            decision: evaluation.decision,
            trade,
            timestamp: Utc::now(),
        })
    }

    /// Core pipeline on already-extracted inputs. A BET is settled by the
    /// simulator; nothing is recorded when any stage fails.
    pub fn decide(
        &self,
        match_name: &str,
        features: &MatchFeatures,
        book: &BookOdds,
    ) -> Result<(Evaluation, Option<Trade>), EngineError> {
        let evaluation = evaluate(features, book, self.ledger.bankroll(), &self.sizing)?;

        let trade = match &evaluation.decision {
            Decision::Bet(bet) => {
                info!(
                    "🎯 {}: {} @{:.2} (fair {:.2}) edge {:.2}% stake {:.2}",
                    match_name, bet.market, bet.book_odds, bet.fair_odds, bet.edge_pct,
                    bet.stake_amount
                );
                Some(self.simulator.execute(&self.ledger, match_name, bet)?)
            }
            Decision::NoBet { max_edge } => {
                info!("{}: no bet (max edge {:.2}%)", match_name, max_edge);
                None
            }
        };
        Ok((evaluation, trade))
    }

    pub fn performance(&self) -> Result<PerformanceReport, EngineError> {
        performance::analyze(&self.ledger.trades())
    }

    async fn read_screenshot(&self, image: &[u8]) -> Result<OcrOdds, String> {
        let reader = self
            .odds_reader
            .as_ref()
            .ok_or_else(|| "no screenshot reader configured".to_string())?;
        match reader.read_odds(image).await {
            Ok(Some(odds)) => Ok(odds),
            Ok(None) => Err(format!("{} could not read three prices", reader.name())),
            Err(e) => Err(format!("{} failed: {:#}", reader.name(), e)),
        }
    }
}
