//! Fetcher - periodic upstream poll
//!
//! Sole writer of the time-series store. Each cycle fetches one document
//! (outside the store lock), normalizes it and writes the batch under a
//! single poll timestamp. A failed cycle writes nothing; the loop never
//! exits on its own.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::normalizer::parse_sections;
use super::sources::{FetchError, UpstreamSource};
use crate::store::{SharedStore, WriteSummary};
use crate::types::{now_ms, TimestampMs};

/// Consecutive failures between two `warn` lines; the rest go to `debug`
const FAILURE_WARN_EVERY: u32 = 60;

/// Receives the outcome of every poll cycle
#[cfg_attr(test, mockall::automock)]
pub trait PollObserver: Send + Sync {
    fn on_success(&self, ts: TimestampMs, summary: &WriteSummary);

    /// `consecutive` counts this failure (1 for the first in a row)
    fn on_failure(&self, error: &FetchError, consecutive: u32);
}

pub struct Fetcher {
    source: Arc<dyn UpstreamSource>,
    store: SharedStore,
    observer: Arc<dyn PollObserver>,
    interval: Duration,
    consecutive_failures: AtomicU32,
}

impl Fetcher {
    pub fn new(
        source: Arc<dyn UpstreamSource>,
        store: SharedStore,
        observer: Arc<dyn PollObserver>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            observer,
            interval,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Poll forever at the configured interval
    pub async fn run(&self) {
        tracing::info!(
            source = %self.source.name(),
            interval_ms = self.interval.as_millis() as u64,
            "Starting upstream poller"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            // Outcome is already routed to the observer
            let _ = self.poll_once().await;
        }
    }

    /// Run a single cycle: fetch, normalize, write
    pub async fn poll_once(&self) -> Result<WriteSummary, FetchError> {
        match self.source.fetch().await {
            Ok(doc) => {
                let sections = parse_sections(&doc);
                let ts = now_ms();
                let summary = {
                    let mut store = self.store.lock().await;
                    store.apply_batch(&sections, ts)
                };
                self.consecutive_failures.store(0, Ordering::Relaxed);
                self.observer.on_success(ts, &summary);
                Ok(summary)
            }
            Err(e) => {
                let consecutive = self
                    .consecutive_failures
                    .fetch_add(1, Ordering::Relaxed)
                    .saturating_add(1);
                self.observer.on_failure(&e, consecutive);
                Err(e)
            }
        }
    }
}

/// Feed health snapshot for `/api/health`
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedHealth {
    pub successful_polls: u64,
    pub failed_polls: u64,
    pub consecutive_failures: u32,
    pub last_success_ts: Option<TimestampMs>,
    pub last_error: Option<String>,
    pub last_batch: Option<WriteSummary>,
}

/// Default observer: counts cycles and logs failures quietly
#[derive(Debug, Default)]
pub struct FeedMonitor {
    successes: AtomicU64,
    failures: AtomicU64,
    consecutive: AtomicU32,
    last_success_ts: AtomicI64,
    last_error: Mutex<Option<String>>,
    last_batch: Mutex<Option<WriteSummary>>,
}

impl FeedMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> FeedHealth {
        let last_success_ts = self.last_success_ts.load(Ordering::Relaxed);
        FeedHealth {
            successful_polls: self.successes.load(Ordering::Relaxed),
            failed_polls: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive.load(Ordering::Relaxed),
            last_success_ts: (last_success_ts > 0).then_some(last_success_ts),
            last_error: self.last_error.lock().ok().and_then(|e| e.clone()),
            last_batch: self.last_batch.lock().ok().and_then(|b| *b),
        }
    }
}

impl PollObserver for FeedMonitor {
    fn on_success(&self, ts: TimestampMs, summary: &WriteSummary) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.last_success_ts.store(ts, Ordering::Relaxed);

        let recovered_after = self.consecutive.swap(0, Ordering::Relaxed);
        if recovered_after >= FAILURE_WARN_EVERY {
            tracing::info!(failures = recovered_after, "Upstream feed recovered");
        }

        if let Ok(mut last) = self.last_batch.lock() {
            *last = Some(*summary);
        }

        tracing::trace!(
            exchanges = summary.exchanges,
            rows = summary.rows,
            prices = summary.prices,
            funding = summary.funding,
            "Poll cycle stored"
        );
    }

    fn on_failure(&self, error: &FetchError, consecutive: u32) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive.store(consecutive, Ordering::Relaxed);

        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error.to_string());
        }

        if consecutive % FAILURE_WARN_EVERY == 0 {
            tracing::warn!(error = %error, consecutive, "Upstream still unavailable");
        } else {
            tracing::debug!(error = %error, consecutive, "Poll cycle failed, retrying next tick");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TimeSeriesStore;
    use async_trait::async_trait;
    use mockall::predicate::*;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    /// Replays a fixed script of outcomes, then keeps failing
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Value, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Value, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl UpstreamSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "Scripted"
        }

        async fn fetch(&self) -> Result<Value, FetchError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transport("script exhausted".to_string())))
        }
    }

    fn doc(mid_a: f64, mid_b: f64) -> Value {
        json!({
            "data": {
                "binancePerp": {"list": [{"name": "BTCUSDT", "b": mid_a, "a": mid_a, "fundingRate": "0.0001"}]},
                "okxSwap": {"list": [{"name": "BTCUSDT", "b": mid_b, "a": mid_b}]}
            }
        })
    }

    fn fetcher(
        script: Vec<Result<Value, FetchError>>,
        observer: Arc<dyn PollObserver>,
    ) -> (Fetcher, SharedStore) {
        let store = SharedStore::new(TimeSeriesStore::new(100, 200));
        let fetcher = Fetcher::new(
            Arc::new(ScriptedSource::new(script)),
            store.clone(),
            observer,
            Duration::from_secs(1),
        );
        (fetcher, store)
    }

    #[tokio::test]
    async fn test_failures_are_reported_and_history_untouched() {
        let mut observer = MockPollObserver::new();
        observer.expect_on_success().times(1).return_const(());
        observer
            .expect_on_failure()
            .with(always(), eq(1u32))
            .times(1)
            .return_const(());
        observer
            .expect_on_failure()
            .with(always(), eq(2u32))
            .times(1)
            .return_const(());
        observer
            .expect_on_failure()
            .with(always(), eq(3u32))
            .times(1)
            .return_const(());

        let (fetcher, store) = fetcher(
            vec![
                Ok(doc(100.0, 101.0)),
                Err(FetchError::Status(502)),
                Err(FetchError::Decode("truncated".to_string())),
                Err(FetchError::Transport("timeout".to_string())),
            ],
            Arc::new(observer),
        );

        assert!(fetcher.poll_once().await.is_ok());
        for _ in 0..3 {
            assert!(fetcher.poll_once().await.is_err());
        }

        let store = store.lock().await;
        assert_eq!(store.recent("BTCUSDT", "binance", 10).len(), 1);
        assert_eq!(store.recent("BTCUSDT", "okx", 10).len(), 1);
        assert_eq!(store.latest_funding("BTCUSDT", "binance").unwrap().rate, 0.0001);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_count() {
        let monitor = Arc::new(FeedMonitor::new());
        let (fetcher, _store) = fetcher(
            vec![
                Err(FetchError::Status(500)),
                Err(FetchError::Status(500)),
                Ok(doc(1.0, 2.0)),
                Err(FetchError::Status(503)),
            ],
            monitor.clone(),
        );

        for _ in 0..4 {
            let _ = fetcher.poll_once().await;
        }

        let health = monitor.snapshot();
        assert_eq!(health.successful_polls, 1);
        assert_eq!(health.failed_polls, 3);
        assert_eq!(health.consecutive_failures, 1);
        assert!(health.last_success_ts.is_some());
        assert_eq!(health.last_error.as_deref(), Some("upstream returned HTTP 503"));
        assert_eq!(health.last_batch.unwrap().prices, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_consecutive_failures() {
        let monitor = Arc::new(FeedMonitor::new());
        let (fetcher, store) = fetcher(Vec::new(), monitor.clone());
        let fetcher = Arc::new(fetcher);

        let runner = fetcher.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_millis(10_500)).await;

        assert!(!handle.is_finished());
        let health = monitor.snapshot();
        assert!(health.failed_polls >= 10, "failed polls: {}", health.failed_polls);
        assert_eq!(health.successful_polls, 0);
        assert_eq!(store.lock().await.instrument_count(), 0);

        handle.abort();
    }
}
