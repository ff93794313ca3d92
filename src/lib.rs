//! Scoreboard polling and growth forecasting
//!
//! Polls a Discord scoreboard message on a fixed interval, records tree
//! heights in SQLite, derives growth rates from consecutive measurements
//! and publishes height predictions back to the channel.

pub mod chat;
pub mod config;
pub mod error;
pub mod forecast;
pub mod growth;
pub mod poller;
pub mod scoreboard;
pub mod store;

pub use config::Config;
pub use error::{ChatError, CycleError, ParseError, StoreError};
pub use poller::{CycleOutcome, Poller};
pub use scoreboard::ScoreboardEntry;
pub use store::Measurement;
