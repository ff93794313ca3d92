//! Integration tests for the full polling pipeline
//!
//! Tests drive the public crate API end to end: a scripted chat client
//! stands in for Discord, everything else is real (SQLite store, growth
//! rates, forecaster, poller).
//!
//! Key integration points tested:
//! - Fetch, record, forecast, publish across consecutive cycles
//! - Refresh request round trip when the scoreboard does not change
//! - The run loop starting immediately and stopping on shutdown

#[cfg(test)]
mod poller_integration_tests {
    use async_trait::async_trait;
    use growflow::chat::ChatClient;
    use growflow::error::ChatError;
    use growflow::forecast::select_strategy;
    use growflow::store::{run_schema_migrations, MeasurementStore, SqliteMeasurementStore};
    use growflow::{Config, CycleOutcome, Poller};
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;
    use tokio::sync::watch;
    use tokio::time::{timeout, Duration};

    const T0: i64 = 1_700_000_000;
    const BOARD_10: &str = "`#1` - `trukipouss` - 10.00ft 📏";
    const BOARD_14: &str = "`#1` - `trukipouss` - 14.00ft 📏";

    /// Chat stand-in that replays a fetch script and records traffic.
    /// The last script entry repeats once the script runs out.
    struct ScriptedChat {
        responses: Vec<String>,
        fetch_count: AtomicUsize,
        posted: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
    }

    impl ScriptedChat {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: responses.iter().map(|s| s.to_string()).collect(),
                fetch_count: AtomicUsize::new(0),
                posted: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
            })
        }

        fn posted_contents(&self) -> Vec<String> {
            self.posted.lock().unwrap().clone()
        }

        fn deleted_count(&self) -> usize {
            self.deleted.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn fetch_scoreboard(&self) -> Result<String, ChatError> {
            let idx = self.fetch_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.responses[idx.min(self.responses.len() - 1)].clone())
        }

        async fn post_message(&self, content: &str) -> Result<String, ChatError> {
            let mut posted = self.posted.lock().unwrap();
            posted.push(content.to_string());
            Ok(format!("msg-{}", posted.len()))
        }

        async fn delete_message(&self, message_id: &str) -> Result<(), ChatError> {
            self.deleted.lock().unwrap().push(message_id.to_string());
            Ok(())
        }
    }

    fn test_config() -> Config {
        Config {
            discord_token: "test-token".to_string(),
            channel_id: "channel".to_string(),
            message_id: "message".to_string(),
            db_path: "unused".to_string(),
            poll_interval_secs: 3_600,
            refresh_retry_delay_secs: 1,
            max_refresh_attempts: 5,
            alpha: 0.5,
            beta: 0.1,
            horizon_hours: 2.0,
            forecast_strategy: "double".to_string(),
            rolling_window: 3,
            tracked_trees: vec!["trukipouss".to_string()],
        }
    }

    /// Build a poller over a fresh temp database. Returns the temp file
    /// handle (keeps the db alive), a store probe and the poller.
    fn build_poller(
        chat: Arc<ScriptedChat>,
        config: Config,
        clock: Arc<AtomicI64>,
    ) -> (NamedTempFile, Arc<SqliteMeasurementStore>, Poller) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();

        let mut conn = rusqlite::Connection::open(db_path).unwrap();
        run_schema_migrations(&mut conn).unwrap();
        drop(conn);

        let store = Arc::new(SqliteMeasurementStore::new(db_path).unwrap());
        let strategy = select_strategy(
            &config.forecast_strategy,
            config.alpha,
            config.beta,
            config.rolling_window,
        );

        let now = clock.clone();
        let poller = Poller::new_with_timestamp_fn(
            chat,
            store.clone(),
            strategy,
            config,
            Box::new(move || now.load(Ordering::SeqCst)),
        );
        (temp_file, store, poller)
    }

    #[tokio::test]
    async fn test_two_cycles_record_and_predict() {
        // Test: full pipeline over two cycles; the second cycle has one
        // growth rate (2 ft/h over 2h) and publishes 14 + 2*2 = 18.00

        // 1. First cycle records the initial height, nothing to forecast
        let chat = ScriptedChat::new(&[BOARD_10, BOARD_14]);
        let clock = Arc::new(AtomicI64::new(T0));
        let (_temp, store, poller) = build_poller(chat.clone(), test_config(), clock.clone());
        let (_tx, rx) = watch::channel(false);

        let first = poller.poll_once(rx.clone()).await.unwrap();
        assert_eq!(
            first,
            CycleOutcome::Completed {
                entries: 1,
                predictions: 0
            }
        );
        assert!(chat.posted_contents().is_empty());

        // 2. Two hours later the scoreboard moved to 14ft
        clock.store(T0 + 2 * 3600, Ordering::SeqCst);
        let second = poller.poll_once(rx).await.unwrap();
        assert_eq!(
            second,
            CycleOutcome::Completed {
                entries: 1,
                predictions: 1
            }
        );
        assert_eq!(
            chat.posted_contents(),
            vec!["Prediction for trukipouss in 2h: 18.00 ft".to_string()]
        );

        // 3. Both measurements landed in the store, in order
        let history = store.history("trukipouss").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].height, 10.0);
        assert_eq!(history[1].height, 14.0);
        assert_eq!(history[1].captured_at, T0 + 2 * 3600);
    }

    #[tokio::test]
    async fn test_refresh_request_round_trip() {
        // Test: an unchanged scoreboard triggers exactly one refresh
        // request, which is deleted once the board moves

        // Script: cycle 1 sees the board, cycle 2 re-fetches it unchanged
        // twice before it finally changes
        let chat = ScriptedChat::new(&[BOARD_10, BOARD_10, BOARD_10, BOARD_14]);
        let clock = Arc::new(AtomicI64::new(T0));
        let (_temp, store, poller) = build_poller(chat.clone(), test_config(), clock.clone());
        let (_tx, rx) = watch::channel(false);

        poller.poll_once(rx.clone()).await.unwrap();

        clock.store(T0 + 2 * 3600, Ordering::SeqCst);
        let outcome = poller.poll_once(rx).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Completed { .. }));

        let posted = chat.posted_contents();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0], "Please refresh the scoreboard");
        assert!(posted[1].starts_with("Prediction for trukipouss"));
        assert_eq!(chat.deleted_count(), 1);

        // The stale fetches were never recorded
        assert_eq!(store.history("trukipouss").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_loop_first_tick_and_shutdown() {
        // Test: run() executes a cycle immediately at startup and exits
        // promptly when the shutdown flag flips

        let chat = ScriptedChat::new(&[BOARD_10]);
        let clock = Arc::new(AtomicI64::new(T0));
        let (_temp, store, poller) = build_poller(chat.clone(), test_config(), clock);
        let (tx, rx) = watch::channel(false);

        // 1. Start the loop; the poll interval is an hour, so only the
        //    immediate first tick can have run by the time we stop it
        let handle = tokio::spawn(async move { poller.run(rx).await });
        tokio::time::sleep(Duration::from_millis(500)).await;

        // 2. Signal shutdown and wait for the loop to wind down
        tx.send(true).unwrap();
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("run loop should stop after shutdown")
            .unwrap();

        // 3. Exactly one cycle ran
        assert_eq!(store.history("trukipouss").await.unwrap().len(), 1);
    }
}
