use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod dashboard;
mod db;
mod engine;
mod intake;

use config::Config;
use dashboard::AppState;
use db::Database;
use engine::ledger::Ledger;
use engine::simulator::{RandomOutcomes, TradeSimulator};
use engine::Engine;
use intake::{OddsReader, VisionOddsReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let sizing = config.sizing();
    info!(
        "💰 Kelly x{:.2}, cap {:.1}% of bankroll, min edge {:.1}%",
        sizing.kelly_fraction,
        sizing.max_stake_pct * 100.0,
        sizing.min_edge_pct
    );

    // Open database and rebuild the bankroll from stored trades
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);
    let ledger = Ledger::open(config.initial_bankroll, db)
        .context("Trade ledger does not replay cleanly")?;
    if ledger.is_empty() {
        info!("Fresh ledger, bankroll ${:.2}", ledger.bankroll());
    } else {
        info!("Bankroll: ${:.2} ({} trade(s))", ledger.bankroll(), ledger.len());
    }

    let simulator = TradeSimulator::new(
        config.sim_win_probability,
        Box::new(RandomOutcomes::from_seed(config.sim_seed)),
    );
    match config.sim_seed {
        Some(seed) => info!(
            "🎲 Paper trades win with p={:.2} (seed {})",
            simulator.win_probability(),
            seed
        ),
        None => info!("🎲 Paper trades win with p={:.2}", simulator.win_probability()),
    }

    let odds_reader: Option<Arc<dyn OddsReader>> = match config.vision_api_key.as_deref() {
        Some(key) => {
            let reader =
                VisionOddsReader::new(key, &config.vision_api_url, &config.vision_model)?;
            info!("Screenshot OCR via {} ({})", config.vision_api_url, config.vision_model);
            Some(Arc::new(reader))
        }
        None => {
            warn!("OPENAI_API_KEY not set: screenshot OCR disabled, odds must be in the report text");
            None
        }
    };

    let engine = Engine::new(sizing, Arc::new(ledger), simulator, odds_reader);

    let app = dashboard::router(AppState {
        engine: Arc::new(engine),
    });
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Desk listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
