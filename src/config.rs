use clap::Parser;

use crate::engine::kelly::SizingConfig;
use crate::engine::simulator::DEFAULT_WIN_PROBABILITY;

/// Football value-betting desk
#[derive(Parser, Debug, Clone)]
#[command(name = "valuebet-desk", version, about)]
pub struct Config {
    /// Bankroll the ledger starts from (trades are replayed on top of it)
    #[arg(long, env = "INITIAL_BANKROLL", default_value = "10000.0")]
    pub initial_bankroll: f64,

    /// Fraction of full Kelly to stake
    #[arg(long, env = "KELLY_FRACTION", default_value = "0.25")]
    pub kelly_fraction: f64,

    /// Hard cap on a single stake, as a fraction of bankroll
    #[arg(long, env = "MAX_STAKE_PCT", default_value = "0.05")]
    pub max_stake_pct: f64,

    /// Minimum edge (percent) before a bet is placed
    #[arg(long, env = "MIN_EDGE_PCT", default_value = "3.0")]
    pub min_edge_pct: f64,

    /// Win probability used to settle paper trades
    #[arg(long, env = "SIM_WIN_PROBABILITY", default_value_t = DEFAULT_WIN_PROBABILITY)]
    pub sim_win_probability: f64,

    /// Seed for paper-trade settlement (random when unset)
    #[arg(long, env = "SIM_SEED")]
    pub sim_seed: Option<u64>,

    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5000")]
    pub listen_addr: String,

    /// SQLite ledger path (`:memory:` for a throwaway ledger)
    #[arg(long, env = "DATABASE_PATH", default_value = "valuebet.db")]
    pub database_path: String,

    /// OpenAI-compatible API base URL for screenshot OCR
    #[arg(long, env = "VISION_API_URL", default_value = "https://api.openai.com/v1")]
    pub vision_api_url: String,

    /// API key for screenshot OCR; OCR is disabled when unset
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub vision_api_key: Option<String>,

    /// Vision model used for screenshot OCR
    #[arg(long, env = "VISION_MODEL", default_value = "gpt-4o-mini")]
    pub vision_model: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.initial_bankroll.is_finite() || self.initial_bankroll <= 0.0 {
            anyhow::bail!("initial_bankroll must be positive");
        }
        if !(self.kelly_fraction > 0.0 && self.kelly_fraction <= 1.0) {
            anyhow::bail!("kelly_fraction must be in (0.0, 1.0]");
        }
        if !(self.max_stake_pct > 0.0 && self.max_stake_pct <= 1.0) {
            anyhow::bail!("max_stake_pct must be in (0.0, 1.0]");
        }
        if !self.min_edge_pct.is_finite() || self.min_edge_pct < 0.0 {
            anyhow::bail!("min_edge_pct must be a non-negative percentage");
        }
        if !(0.0..=1.0).contains(&self.sim_win_probability) {
            anyhow::bail!("sim_win_probability must be between 0.0 and 1.0");
        }
        self.listen_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid listen_addr '{}': {}", self.listen_addr, e))?;
        let vision = url::Url::parse(&self.vision_api_url)
            .map_err(|e| anyhow::anyhow!("invalid vision_api_url '{}': {}", self.vision_api_url, e))?;
        if !matches!(vision.scheme(), "http" | "https") {
            anyhow::bail!("vision_api_url must be http(s), got '{}'", vision.scheme());
        }
        Ok(())
    }

    /// Sizing parameters handed to the decision engine.
    pub fn sizing(&self) -> SizingConfig {
        SizingConfig {
            kelly_fraction: self.kelly_fraction,
            max_stake_pct: self.max_stake_pct,
            min_edge_pct: self.min_edge_pct,
        }
    }
}
