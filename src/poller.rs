//! Change-detection polling cycle
//!
//! Each scheduled tick walks one cycle:
//!
//! ```text
//! fetch -> compare to last snapshot
//!   unchanged -> post a refresh request -> re-fetch on a short delay
//!               (bounded attempts, cancellable by shutdown)
//!   changed   -> store snapshot -> parse -> record measurements
//!               -> growth rates -> forecast -> publish predictions
//! ```
//!
//! At most one cycle runs at a time. The single-flight guard is a mutex
//! whose RAII lock guard is held for the whole cycle, so it is released on
//! every exit path including errors. Overlapping ticks are skipped, not
//! queued.

use crate::chat::ChatClient;
use crate::config::Config;
use crate::error::CycleError;
use crate::forecast::ForecastStrategy;
use crate::growth;
use crate::scoreboard;
use crate::store::MeasurementStore;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, sleep, Duration};

/// How one polling cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Scoreboard changed and the pipeline ran to completion
    Completed { entries: usize, predictions: usize },
    /// Scoreboard never changed within the re-fetch budget; recoverable,
    /// the next scheduled tick starts fresh
    StillUnchanged { attempts: u32 },
    /// A cycle was already running, this tick did nothing
    Skipped,
    /// Shutdown was signalled while waiting for a refresh
    Shutdown,
}

/// Result of waiting for the scoreboard to move
enum RefreshWait {
    Changed(String),
    StillUnchanged { attempts: u32 },
    Interrupted,
}

/// Scoreboard poller and forecasting pipeline driver
///
/// Owns the snapshot slot (last raw scoreboard text seen) and the
/// single-flight guard. Neither is reachable from outside.
pub struct Poller {
    chat: Arc<dyn ChatClient>,
    store: Arc<dyn MeasurementStore>,
    strategy: Box<dyn ForecastStrategy>,
    config: Config,

    /// Last scoreboard text observed; None until the first fetch, so the
    /// first cycle always counts as changed
    snapshot: Mutex<Option<String>>,

    /// Single-flight guard; try_lock failure means a cycle is running
    busy: Mutex<()>,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl Poller {
    /// Create a poller with the system clock
    pub fn new(
        chat: Arc<dyn ChatClient>,
        store: Arc<dyn MeasurementStore>,
        strategy: Box<dyn ForecastStrategy>,
        config: Config,
    ) -> Self {
        Self::new_with_timestamp_fn(
            chat,
            store,
            strategy,
            config,
            Box::new(|| chrono::Utc::now().timestamp()),
        )
    }

    /// Create a poller with a custom timestamp function
    ///
    /// Used for testing with deterministic capture times.
    pub fn new_with_timestamp_fn(
        chat: Arc<dyn ChatClient>,
        store: Arc<dyn MeasurementStore>,
        strategy: Box<dyn ForecastStrategy>,
        config: Config,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            chat,
            store,
            strategy,
            config,
            snapshot: Mutex::new(None),
            busy: Mutex::new(()),
            now_fn,
        }
    }

    /// Run the polling loop until shutdown is signalled.
    ///
    /// The first tick fires immediately, so one cycle runs at startup
    /// before the fixed interval takes over.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "⏰ Polling every {}s with the {} forecaster",
            self.config.poll_interval_secs,
            self.strategy.name()
        );

        let mut timer = interval(Duration::from_secs(self.config.poll_interval_secs));

        loop {
            let cycle_shutdown = shutdown.clone();
            tokio::select! {
                _ = timer.tick() => {
                    match self.poll_once(cycle_shutdown).await {
                        Ok(CycleOutcome::Completed { entries, predictions }) => {
                            log::info!(
                                "✅ Cycle complete: {} measurement(s) recorded, {} prediction(s) published",
                                entries,
                                predictions
                            );
                        }
                        Ok(CycleOutcome::StillUnchanged { attempts }) => {
                            log::warn!(
                                "⚠️  Scoreboard never refreshed after {} re-fetches, waiting for next tick",
                                attempts
                            );
                        }
                        Ok(CycleOutcome::Skipped) | Ok(CycleOutcome::Shutdown) => {}
                        Err(CycleError::Chat(e)) if e.is_transient() => {
                            log::warn!("⚠️  Transient chat failure, retrying next tick: {}", e);
                        }
                        Err(e) => {
                            log::error!("❌ Cycle failed: {}", e);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    log::info!("🛑 Shutdown signal received, stopping poller");
                    break;
                }
            }
        }
    }

    /// Execute one cycle, or skip if a previous one is still running.
    pub async fn poll_once(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<CycleOutcome, CycleError> {
        // Held until return; releasing on every exit path is what keeps
        // single-flight safe across errors
        let _cycle = match self.busy.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::info!("⏭️  Previous cycle still running, skipping this tick");
                return Ok(CycleOutcome::Skipped);
            }
        };

        log::info!("🔍 Fetching scoreboard");
        let fetched = self.chat.fetch_scoreboard().await?;

        let unchanged = {
            let snapshot = self.snapshot.lock().await;
            snapshot.as_deref() == Some(fetched.as_str())
        };

        let text = if unchanged {
            match self.await_refresh(&fetched, &mut shutdown).await? {
                RefreshWait::Changed(new_text) => new_text,
                RefreshWait::StillUnchanged { attempts } => {
                    return Ok(CycleOutcome::StillUnchanged { attempts });
                }
                RefreshWait::Interrupted => return Ok(CycleOutcome::Shutdown),
            }
        } else {
            fetched
        };

        *self.snapshot.lock().await = Some(text.clone());

        self.process(&text).await
    }

    /// Ask a human to refresh the scoreboard, then re-fetch until it moves.
    ///
    /// Compares every re-fetch against the same last-known text. The
    /// request message is deleted again on every exit path so it does not
    /// pile up in the channel.
    async fn await_refresh(
        &self,
        previous: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<RefreshWait, CycleError> {
        let max_attempts = self.config.max_refresh_attempts;
        log::info!(
            "⏳ Scoreboard unchanged, asking for a refresh (up to {} re-fetches)",
            max_attempts
        );

        let request_id = self
            .chat
            .post_message("Please refresh the scoreboard")
            .await?;

        let delay = Duration::from_secs(self.config.refresh_retry_delay_secs);
        let mut outcome = RefreshWait::StillUnchanged {
            attempts: max_attempts,
        };

        for attempt in 1..=max_attempts {
            if *shutdown.borrow() {
                outcome = RefreshWait::Interrupted;
                break;
            }
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => {
                    log::info!("🛑 Shutdown while waiting for a refresh");
                    outcome = RefreshWait::Interrupted;
                    break;
                }
            }

            match self.chat.fetch_scoreboard().await {
                Ok(text) if text != previous => {
                    log::info!("✅ Scoreboard changed after {} re-fetch(es)", attempt);
                    outcome = RefreshWait::Changed(text);
                    break;
                }
                Ok(_) => {
                    log::debug!("⏳ Re-fetch {} of {}: still unchanged", attempt, max_attempts);
                }
                Err(e) if e.is_transient() => {
                    log::warn!(
                        "⚠️  Re-fetch {} of {} failed ({}), retrying",
                        attempt,
                        max_attempts,
                        e
                    );
                }
                Err(e) => {
                    self.delete_refresh_request(&request_id).await;
                    return Err(e.into());
                }
            }
        }

        self.delete_refresh_request(&request_id).await;
        Ok(outcome)
    }

    async fn delete_refresh_request(&self, message_id: &str) {
        if let Err(e) = self.chat.delete_message(message_id).await {
            log::warn!("⚠️  Could not delete refresh request {}: {}", message_id, e);
        }
    }

    /// Parse, persist, forecast and publish for one changed snapshot.
    ///
    /// Recording covers the trees on this board. Forecasting runs over the
    /// whole tracked list against stored history, so a tree that drops off
    /// one board still gets its prediction that cycle. A store failure
    /// aborts everything that remains of the cycle; the measurements
    /// written before it stay written.
    async fn process(&self, text: &str) -> Result<CycleOutcome, CycleError> {
        let entries = scoreboard::parse_scoreboard(text, &self.config.tracked_trees)?;

        if entries.is_empty() {
            log::info!("📭 No tracked trees on this scoreboard");
        } else {
            // Every tree in the batch shares one capture instant
            let captured_at = (self.now_fn)();
            for entry in &entries {
                self.store
                    .record(&entry.name, entry.height, entry.rank, captured_at)
                    .await?;
                log::info!(
                    "📊 Recorded {} at {:.2} ft (rank {})",
                    entry.name,
                    entry.height,
                    entry.rank
                );
            }
        }

        let horizon = self.config.horizon_hours;
        let mut predictions = 0;
        for name in &self.config.tracked_trees {
            let history = self.store.history(name).await?;
            let last_height = match history.last() {
                Some(measurement) => measurement.height,
                None => {
                    log::info!("⏳ No measurements for {} yet", name);
                    continue;
                }
            };

            let rate_series: Vec<f64> = growth::growth_rates(&history)
                .into_iter()
                .map(|r| r.rate_ft_per_hour)
                .collect();

            let forecast_rate = match self.strategy.forecast(&rate_series, horizon) {
                Some(rate) => rate,
                None => {
                    log::info!("⏳ Not enough history to forecast {} yet", name);
                    continue;
                }
            };

            // The rate forecast extrapolates from the last observed height
            let predicted_height = last_height + forecast_rate * horizon;

            let message = format!(
                "Prediction for {} in {}h: {:.2} ft",
                name, horizon, predicted_height
            );
            self.chat.post_message(&message).await?;
            log::info!("🔮 {}", message);
            predictions += 1;
        }

        Ok(CycleOutcome::Completed {
            entries: entries.len(),
            predictions,
        })
    }
}
