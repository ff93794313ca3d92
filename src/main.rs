//! Growflow Runtime - Scoreboard Forecasting Daemon
//!
//! This binary wires the full pipeline together:
//! - Initializes SQLite database with schema
//! - Builds the Discord client and measurement store
//! - Runs the polling loop until CTRL+C
//!
//! Usage:
//!   cargo run --release
//!
//! Environment variables: see `Config::from_env` (.env is loaded first).

use dotenv::dotenv;
use growflow::chat::DiscordClient;
use growflow::config::Config;
use growflow::forecast::select_strategy;
use growflow::poller::Poller;
use growflow::store::{run_schema_migrations, SqliteMeasurementStore};
use log::{error, info};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::init();

    info!("🚀 Growflow - Scoreboard Growth Forecaster");
    info!("   ├─ Version: 0.1.0");
    info!("   └─ Mode: poll, record, forecast, publish");

    let config = Config::from_env();

    info!("✅ Configuration loaded");
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Poll interval: {}s", config.poll_interval_secs);
    info!(
        "   ├─ Refresh wait: up to {} re-fetches every {}s",
        config.max_refresh_attempts, config.refresh_retry_delay_secs
    );
    info!(
        "   ├─ Forecast: {} (alpha={}, beta={}, horizon={}h)",
        config.forecast_strategy, config.alpha, config.beta, config.horizon_hours
    );
    info!("   └─ Tracked trees: {}", config.tracked_trees.join(", "));

    // Initialize database
    info!("🔧 Initializing database...");
    let mut conn = Connection::open(&config.db_path)?;

    // Run schema migrations (idempotent)
    run_schema_migrations(&mut conn)?;
    drop(conn); // Close temporary connection

    let store = Arc::new(SqliteMeasurementStore::new(&config.db_path)?);
    info!("✅ Database initialized");

    let chat = Arc::new(DiscordClient::new(
        &config.discord_token,
        &config.channel_id,
        &config.message_id,
    )?);
    let strategy = select_strategy(
        &config.forecast_strategy,
        config.alpha,
        config.beta,
        config.rolling_window,
    );

    let poller = Poller::new(chat, store, strategy, config);

    // CTRL+C flips the shutdown flag; the poller drains out of any
    // in-flight refresh wait on its own
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("");
                info!("⚠️  Received CTRL+C, shutting down...");
            }
            Err(err) => {
                error!("❌ Failed to listen for CTRL+C: {}", err);
            }
        }
        let _ = shutdown_tx.send(true);
    });

    info!("🔄 Press CTRL+C to shutdown gracefully");
    poller.run(shutdown_rx).await;

    info!("✅ Growflow stopped");
    Ok(())
}
