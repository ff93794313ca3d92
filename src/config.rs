//! Runtime configuration from environment variables

use std::env;

/// Configuration for the polling and forecasting engine
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,

    /// Channel holding the scoreboard message
    pub channel_id: String,

    /// Message whose embed carries the scoreboard text
    pub message_id: String,

    /// Path to SQLite database file
    pub db_path: String,

    /// Poll cycle interval in seconds
    pub poll_interval_secs: u64,

    /// Delay between re-fetches while waiting for a scoreboard refresh
    pub refresh_retry_delay_secs: u64,

    /// Maximum re-fetches per cycle while waiting for a refresh
    pub max_refresh_attempts: u32,

    /// Level smoothing factor
    pub alpha: f64,

    /// Trend smoothing factor
    pub beta: f64,

    /// Forecast horizon in hours
    pub horizon_hours: f64,

    /// Forecasting strategy name: "double", "single" or "rolling"
    pub forecast_strategy: String,

    /// Trailing window size for the rolling-average strategy
    pub rolling_window: usize,

    /// Tree names kept from each parsed scoreboard
    pub tracked_trees: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DISCORD_TOKEN` (required)
    /// - `SCOREBOARD_CHANNEL_ID` (required)
    /// - `SCOREBOARD_MESSAGE_ID` (required)
    /// - `GROWFLOW_DB_PATH` (default: growflow.db)
    /// - `POLL_INTERVAL_SECS` (default: 1800)
    /// - `REFRESH_RETRY_DELAY_SECS` (default: 5)
    /// - `MAX_REFRESH_ATTEMPTS` (default: 60)
    /// - `FORECAST_ALPHA` (default: 0.5)
    /// - `FORECAST_BETA` (default: 0.1)
    /// - `FORECAST_HORIZON_HOURS` (default: 2)
    /// - `FORECAST_STRATEGY` (default: double)
    /// - `ROLLING_WINDOW` (default: 3)
    /// - `TRACKED_TREES` (comma-separated, default: trukipouss)
    pub fn from_env() -> Self {
        let discord_token = env::var("DISCORD_TOKEN")
            .expect("DISCORD_TOKEN must be set in .env file");

        let channel_id = env::var("SCOREBOARD_CHANNEL_ID")
            .expect("SCOREBOARD_CHANNEL_ID must be set in .env file");

        let message_id = env::var("SCOREBOARD_MESSAGE_ID")
            .expect("SCOREBOARD_MESSAGE_ID must be set in .env file");

        // Tracked trees (comma-separated allow-list)
        let tracked_trees = env::var("TRACKED_TREES")
            .unwrap_or_else(|_| "trukipouss".to_string())
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            discord_token,
            channel_id,
            message_id,

            db_path: env::var("GROWFLOW_DB_PATH")
                .unwrap_or_else(|_| "growflow.db".to_string()),

            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_800),

            refresh_retry_delay_secs: env::var("REFRESH_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),

            max_refresh_attempts: env::var("MAX_REFRESH_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),

            alpha: env::var("FORECAST_ALPHA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.5),

            beta: env::var("FORECAST_BETA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),

            horizon_hours: env::var("FORECAST_HORIZON_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2.0),

            forecast_strategy: env::var("FORECAST_STRATEGY")
                .unwrap_or_else(|_| "double".to_string()),

            rolling_window: env::var("ROLLING_WINDOW")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),

            tracked_trees,
        }
    }
}
