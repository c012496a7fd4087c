//! Paper-trade settlement.
//!
//! There is no settlement feed: a BET is resolved by drawing WIN with a fixed
//! probability. The draw sits behind [`OutcomeSource`] so tests can script
//! results and runs can be reproduced from a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::info;

use crate::db::models::{Trade, TradeResult};

use super::decision::StakeDecision;
use super::error::EngineError;
use super::ledger::Ledger;

/// Default paper-trading win rate.
pub const DEFAULT_WIN_PROBABILITY: f64 = 0.55;

/// Source of simulated settlements.
pub trait OutcomeSource: Send {
    /// Returns `true` when the trade wins.
    fn draw_win(&mut self, win_probability: f64) -> bool;
}

/// RNG-backed outcomes.
pub struct RandomOutcomes<R: Rng + Send> {
    rng: R,
}

impl<R: Rng + Send> RandomOutcomes<R> {
    pub fn new(rng: R) -> Self {
        RandomOutcomes { rng }
    }
}

impl RandomOutcomes<StdRng> {
    /// Seeded when `seed` is given, entropy-seeded otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        RandomOutcomes::new(rng)
    }
}

impl<R: Rng + Send> OutcomeSource for RandomOutcomes<R> {
    fn draw_win(&mut self, win_probability: f64) -> bool {
        self.rng.gen::<f64>() < win_probability
    }
}

/// Replays a fixed script of results, then repeats the last one.
#[cfg(test)]
pub struct ScriptedOutcomes {
    script: std::collections::VecDeque<TradeResult>,
    last: TradeResult,
}

#[cfg(test)]
impl ScriptedOutcomes {
    pub fn new(results: impl IntoIterator<Item = TradeResult>) -> Self {
        ScriptedOutcomes {
            script: results.into_iter().collect(),
            last: TradeResult::Lose,
        }
    }

    pub fn always(result: TradeResult) -> Self {
        ScriptedOutcomes {
            script: Default::default(),
            last: result,
        }
    }
}

#[cfg(test)]
impl OutcomeSource for ScriptedOutcomes {
    fn draw_win(&mut self, _win_probability: f64) -> bool {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last == TradeResult::Win
    }
}

pub struct TradeSimulator {
    win_probability: f64,
    outcomes: Mutex<Box<dyn OutcomeSource>>,
}

impl TradeSimulator {
    pub fn new(win_probability: f64, outcomes: Box<dyn OutcomeSource>) -> Self {
        TradeSimulator {
            win_probability,
            outcomes: Mutex::new(outcomes),
        }
    }

    pub fn win_probability(&self) -> f64 {
        self.win_probability
    }

    /// Draw a settlement for `decision` and append it to `ledger`.
    ///
    /// Takes a `StakeDecision`, which only exists for BET outcomes, so a
    /// NO_BET can never reach the ledger.
    pub fn execute(
        &self,
        ledger: &Ledger,
        match_name: &str,
        decision: &StakeDecision,
    ) -> Result<Trade, EngineError> {
        let won = {
            let mut outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
            outcomes.draw_win(self.win_probability)
        };
        let result = if won { TradeResult::Win } else { TradeResult::Lose };

        let trade = ledger.record(match_name, decision, result)?;
        info!(
            "✅ {}: {} | Profit: {:+.2} | Bankroll: {:.2}",
            trade.id, trade.result, trade.profit, trade.bankroll_after
        );
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::odds::Market;
    use approx::assert_relative_eq;
    use std::thread;

    fn draw_bet() -> StakeDecision {
        StakeDecision {
            market: Market::Draw,
            edge_pct: 120.0,
            fair_odds: 7.7,
            book_odds: 3.5,
            probability: 0.1374,
            stake_amount: 478.02,
            stake_pct_of_bankroll: 4.78,
            confidence: 0.95,
        }
    }

    #[test]
    fn forced_win_pays_book_odds() {
        let ledger = Ledger::new(10_000.0);
        let sim = TradeSimulator::new(0.55, Box::new(ScriptedOutcomes::always(TradeResult::Win)));
        let trade = sim.execute(&ledger, "Home vs Away", &draw_bet()).unwrap();
        assert_eq!(trade.result, TradeResult::Win);
        assert_relative_eq!(trade.profit, 1195.05, epsilon = 1e-9);
        assert_eq!(ledger.bankroll(), trade.bankroll_after);
    }

    #[test]
    fn forced_loss_costs_stake() {
        let ledger = Ledger::new(10_000.0);
        let sim = TradeSimulator::new(0.55, Box::new(ScriptedOutcomes::always(TradeResult::Lose)));
        let trade = sim.execute(&ledger, "Home vs Away", &draw_bet()).unwrap();
        assert_eq!(trade.result, TradeResult::Lose);
        assert_eq!(trade.profit, -478.02);
        assert_relative_eq!(ledger.bankroll(), 9_521.98, epsilon = 1e-9);
    }

    #[test]
    fn scripted_sequence_is_followed() {
        let ledger = Ledger::new(10_000.0);
        let sim = TradeSimulator::new(
            0.55,
            Box::new(ScriptedOutcomes::new([
                TradeResult::Win,
                TradeResult::Lose,
                TradeResult::Win,
            ])),
        );
        let results: Vec<_> = (0..3)
            .map(|_| sim.execute(&ledger, "A vs B", &draw_bet()).unwrap().result)
            .collect();
        assert_eq!(results, vec![TradeResult::Win, TradeResult::Lose, TradeResult::Win]);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = RandomOutcomes::from_seed(Some(42));
        let mut b = RandomOutcomes::from_seed(Some(42));
        let xs: Vec<bool> = (0..32).map(|_| a.draw_win(0.55)).collect();
        let ys: Vec<bool> = (0..32).map(|_| b.draw_win(0.55)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn extreme_win_probabilities_are_deterministic() {
        let mut rng = RandomOutcomes::from_seed(Some(7));
        assert!((0..100).all(|_| rng.draw_win(1.0)));
        assert!((0..100).all(|_| !rng.draw_win(0.0)));
    }

    #[test]
    fn concurrent_simulations_sum_exactly() {
        let ledger = Ledger::new(10_000.0);
        let sim = TradeSimulator::new(0.55, Box::new(RandomOutcomes::from_seed(Some(3))));
        let bet = StakeDecision {
            stake_amount: 128.0,
            book_odds: 2.25,
            ..draw_bet()
        };

        thread::scope(|s| {
            for _ in 0..6 {
                s.spawn(|| {
                    for _ in 0..40 {
                        sim.execute(&ledger, "Concurrent", &bet).unwrap();
                    }
                });
            }
        });

        let snap = ledger.snapshot();
        assert_eq!(snap.trades.len(), 240);
        let total: f64 = snap.trades.iter().map(|t| t.profit).sum();
        assert_eq!(snap.bankroll, 10_000.0 + total);
    }
}
