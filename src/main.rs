//! WAGERBOOK: wager ledger and settlement engine.
//!
//! Entry point. Loads configuration, initialises structured logging, opens
//! the SQLite store and runs the auto-bet and auto-odds workers until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use wagerbook::config;
use wagerbook::engine::WagerEngine;
use wagerbook::storage::sqlite::SqliteStore;
use wagerbook::workers::autobet::AutoBetJob;
use wagerbook::workers::odds::AutoOddsJob;
use wagerbook::workers::PeriodicWorker;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging();

    info!(
        service = %cfg.service.name,
        auto_bet = cfg.auto_bet.enabled,
        auto_odds = cfg.auto_odds.enabled,
        "WAGERBOOK starting up"
    );

    let url = cfg.storage.resolved_url();
    let store = Arc::new(
        SqliteStore::connect(&url, cfg.storage.max_connections)
            .await
            .with_context(|| format!("Failed to open database: {url}"))?,
    );
    let engine = Arc::new(WagerEngine::new(store.clone()));

    // -- Workers -----------------------------------------------------------

    let mut workers = Vec::new();

    if cfg.auto_bet.enabled {
        let job = AutoBetJob::new(engine.clone(), cfg.auto_bet.sizing());
        workers.push(PeriodicWorker::start(Arc::new(job), cfg.auto_bet.interval()));
    }

    if cfg.auto_odds.enabled {
        let job = AutoOddsJob::new(store.clone());
        workers.push(PeriodicWorker::start(Arc::new(job), cfg.auto_odds.interval()));
    }

    info!(workers = workers.len(), "Running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received.");

    for worker in workers {
        worker.stop().await;
    }
    store.close().await;

    info!("WAGERBOOK shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wagerbook=info"));

    let json_logging = std::env::var("WAGERBOOK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
