//! Poll → diff → report → deliver loop.
//!
//! The scheduler owns the snapshot store and runs one cycle at a time. Every
//! per-cycle failure is logged and absorbed here; nothing escapes the loop.

use crate::api::gateway::{ClientGateway, Session};
use crate::core::config::Config;
use crate::core::error::{DeliveryError, FetchError};
use crate::engine::diff::diff;
use crate::models::snapshot::Snapshot;
use crate::models::torrent::TorrentRecord;
use crate::notify::notifier::Notifier;
use crate::report::formatter::{format_report, Report};
use crate::stores::snapshot_store::SnapshotStore;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Polling,
    Diffing,
    Reporting,
    /// Last fetch failed; the next poll is delayed
    Backoff,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Polling => "polling",
            CycleState::Diffing => "diffing",
            CycleState::Reporting => "reporting",
            CycleState::Backoff => "backoff",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Report delivered and snapshot advanced
    Reported,
    /// Snapshot advanced but the report was not delivered
    DeliveryFailed,
    /// No snapshot this cycle; store untouched
    FetchFailed,
    /// Shutdown requested before the fetch completed
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Time between cycle starts
    pub interval: Duration,
    /// Bound on each external call
    pub request_timeout: Duration,
    /// Longest wait after repeated fetch failures
    pub max_backoff: Duration,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.interval(),
            request_timeout: config.request_timeout(),
            max_backoff: config.max_backoff(),
        }
    }
}

/// Delay before the next cycle after `failures` consecutive fetch failures.
///
/// The first failure waits one normal interval, then the wait doubles up to
/// `max_backoff`. Never shorter than the interval.
pub fn backoff_delay(failures: u32, interval: Duration, max_backoff: Duration) -> Duration {
    if failures <= 1 {
        return interval;
    }
    let factor = 2u32.saturating_pow(failures - 1);
    interval
        .checked_mul(factor)
        .unwrap_or(max_backoff)
        .min(max_backoff)
        .max(interval)
}

/// Add up to 10% random jitter so restarts of many pollers do not align
fn with_jitter(delay: Duration) -> Duration {
    let max_extra = delay.as_millis() as u64 / 10;
    if max_extra == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=max_extra))
}

pub struct Scheduler<G, N> {
    gateway: G,
    notifier: N,
    settings: SchedulerSettings,
    store: SnapshotStore,
    session: Option<Session>,
    state: CycleState,
    consecutive_failures: u32,
    last_success: Option<Instant>,
}

impl<G, N> Scheduler<G, N>
where
    G: ClientGateway,
    N: Notifier,
{
    pub fn new(gateway: G, notifier: N, settings: SchedulerSettings) -> Self {
        Self {
            gateway,
            notifier,
            settings,
            store: SnapshotStore::new(),
            session: None,
            state: CycleState::Idle,
            consecutive_failures: 0,
            last_success: None,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// Cycle starts are spaced by the interval. A cycle that overruns defers
    /// the next one instead of overlapping it.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            request_timeout_secs = self.settings.request_timeout.as_secs(),
            max_backoff_secs = self.settings.max_backoff.as_secs(),
            "Scheduler started"
        );

        loop {
            let started = Instant::now();
            let outcome = self.run_cycle(&shutdown).await;

            if outcome == CycleOutcome::Cancelled || shutdown.is_cancelled() {
                break;
            }

            let wait = match outcome {
                CycleOutcome::FetchFailed => {
                    let delay = with_jitter(backoff_delay(
                        self.consecutive_failures,
                        self.settings.interval,
                        self.settings.max_backoff,
                    ));
                    info!(
                        consecutive_failures = self.consecutive_failures,
                        delay_secs = delay.as_secs(),
                        "Backing off before next poll"
                    );
                    delay
                }
                _ => self.settings.interval,
            };

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = sleep_until(started + wait) => {}
            }

            self.transition(CycleState::Idle);
        }

        self.transition(CycleState::Idle);
        info!("Scheduler stopped");
    }

    /// Drive one full cycle from `Idle` back to `Idle` (or `Backoff`).
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> CycleOutcome {
        self.transition(CycleState::Polling);

        let fetched = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            result = self.fetch() => Some(result),
        };

        let current = match fetched {
            None => {
                info!("Shutdown requested, abandoning poll");
                self.transition(CycleState::Idle);
                return CycleOutcome::Cancelled;
            }
            Some(Ok(snapshot)) => snapshot,
            Some(Err(e)) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                match &e {
                    FetchError::InvalidSnapshot(detail) => error!(
                        error = %detail,
                        consecutive_failures = self.consecutive_failures,
                        "Dropping malformed snapshot from torrent client"
                    ),
                    _ => warn!(
                        error = %e,
                        consecutive_failures = self.consecutive_failures,
                        "Failed to fetch torrents, keeping previous snapshot"
                    ),
                }
                self.transition(CycleState::Backoff);
                return CycleOutcome::FetchFailed;
            }
        };

        self.transition(CycleState::Diffing);

        let now = Instant::now();
        let elapsed = self.last_success.map(|last| now.duration_since(last));
        if self.store.is_baseline() {
            info!(torrents = current.len(), "Recording baseline snapshot");
        }
        let delta = diff(self.store.get(), &current);

        if self.consecutive_failures > 0 {
            info!(
                failed_polls = self.consecutive_failures,
                "Torrent client reachable again"
            );
        }
        self.consecutive_failures = 0;
        self.last_success = Some(now);

        if delta.counter_resets > 0 {
            warn!(
                counter_resets = delta.counter_resets,
                "Transfer counters went backwards, clamped to zero"
            );
        }
        debug!(
            torrents = delta.total_count,
            added = delta.added.len(),
            removed = delta.removed.len(),
            downloaded = delta.download_delta_bytes,
            uploaded = delta.upload_delta_bytes,
            baseline = delta.baseline,
            "Computed delta"
        );

        self.transition(CycleState::Reporting);
        let report = format_report(&delta, elapsed);

        let delivered = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            result = self.deliver(&report) => Some(result),
        };

        let outcome = match delivered {
            Some(Ok(())) => {
                info!(
                    torrents = delta.total_count,
                    added = delta.added.len(),
                    removed = delta.removed.len(),
                    "Report delivered"
                );
                CycleOutcome::Reported
            }
            Some(Err(e)) => {
                warn!(error = %e, "Failed to deliver report, advancing snapshot anyway");
                CycleOutcome::DeliveryFailed
            }
            None => {
                info!("Shutdown requested, abandoning delivery");
                CycleOutcome::DeliveryFailed
            }
        };

        // Advance regardless of delivery so the same changes are never reported twice
        self.store.replace(current);
        self.transition(CycleState::Idle);

        outcome
    }

    async fn fetch(&mut self) -> Result<Snapshot, FetchError> {
        let records = self.fetch_records().await?;
        Ok(Snapshot::from_records(records)?)
    }

    async fn fetch_records(&mut self) -> Result<Vec<TorrentRecord>, FetchError> {
        let session = match self.session.clone() {
            Some(session) => session,
            None => self.login().await?,
        };

        let limit = self.settings.request_timeout;
        let listed = timed(limit, self.gateway.list_torrents(&session)).await;
        match listed {
            Err(FetchError::Gateway(e)) if e.is_auth_expiry() => {
                info!("Torrent client session expired, re-authenticating");
                self.session = None;
                let session = self.login().await?;
                let result = timed(limit, self.gateway.list_torrents(&session)).await;
                if let Err(FetchError::Gateway(e)) = &result {
                    if e.is_auth_expiry() {
                        self.session = None;
                    }
                }
                result
            }
            other => other,
        }
    }

    async fn login(&mut self) -> Result<Session, FetchError> {
        let session = timed(self.settings.request_timeout, self.gateway.authenticate()).await?;
        debug!("Torrent client session established");
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        let limit = self.settings.request_timeout;
        match tokio::time::timeout(limit, self.notifier.deliver(report)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(limit.as_secs())),
        }
    }

    fn transition(&mut self, next: CycleState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Scheduler state change");
            self.state = next;
        }
    }
}

async fn timed<T, E, F>(limit: Duration, call: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, E>>,
    FetchError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(FetchError::from),
        Err(_) => Err(FetchError::Timeout(limit.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GatewayError;
    use crate::models::torrent::{TorrentId, TorrentState};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Poll = Result<Vec<TorrentRecord>, GatewayError>;

    #[derive(Clone, Default)]
    struct FakeGateway {
        polls: Arc<Mutex<VecDeque<Poll>>>,
        auth_calls: Arc<AtomicUsize>,
        delay: Option<Duration>,
        always_fail: bool,
        /// Start time of every `list_torrents` call
        calls: Arc<Mutex<Vec<Instant>>>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl FakeGateway {
        fn with_polls(polls: Vec<Poll>) -> Self {
            Self {
                polls: Arc::new(Mutex::new(polls.into())),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ClientGateway for FakeGateway {
        async fn authenticate(&self) -> Result<Session, GatewayError> {
            let n = self.auth_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Session::new(n as u64 + 1))
        }

        async fn list_torrents(&self, _session: &Session) -> Result<Vec<TorrentRecord>, GatewayError> {
            self.calls.lock().unwrap().push(Instant::now());
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.always_fail {
                return Err(GatewayError::Status(503));
            }
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Clone, Default)]
    struct FakeNotifier {
        delivered: Arc<Mutex<Vec<Report>>>,
        fail: Arc<AtomicBool>,
    }

    impl FakeNotifier {
        fn failing() -> Self {
            let notifier = Self::default();
            notifier.fail.store(true, Ordering::SeqCst);
            notifier
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DeliveryError::Rejected {
                    status: 500,
                    body: "unavailable".to_string(),
                });
            }
            self.delivered.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    /// Never finishes a delivery; flags when one was attempted
    #[derive(Clone, Default)]
    struct StalledNotifier {
        entered: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Notifier for StalledNotifier {
        async fn deliver(&self, _report: &Report) -> Result<(), DeliveryError> {
            self.entered.store(true, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    fn gaps(calls: &[Instant]) -> Vec<Duration> {
        calls.windows(2).map(|w| w[1].duration_since(w[0])).collect()
    }

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            interval: Duration::from_millis(20),
            request_timeout: Duration::from_millis(200),
            max_backoff: Duration::from_millis(100),
        }
    }

    fn torrent(id: &str, downloaded: u64) -> TorrentRecord {
        TorrentRecord::new(id, id, TorrentState::Downloading).with_totals(downloaded, 0)
    }

    #[tokio::test]
    async fn test_baseline_then_changes() {
        let gateway = FakeGateway::with_polls(vec![
            Ok(vec![torrent("A", 100)]),
            Ok(vec![torrent("A", 150), torrent("B", 20)]),
        ]);
        let notifier = FakeNotifier::default();
        let delivered = notifier.delivered.clone();
        let mut scheduler = Scheduler::new(gateway, notifier, settings());
        let shutdown = CancellationToken::new();

        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Reported);
        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Reported);

        let reports = delivered.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].header.baseline);
        assert!(reports[0].added.is_none());
        assert!(!reports[1].header.baseline);
        assert_eq!(reports[1].added.as_ref().unwrap()[0].name, "B");
        assert_eq!(reports[1].stats.downloaded_since_last, 70);
        assert!(reports[1].header.interval.is_some());
        assert_eq!(scheduler.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_snapshot() {
        let gateway = FakeGateway::with_polls(vec![
            Ok(vec![torrent("A", 100)]),
            Err(GatewayError::Network("connection refused".to_string())),
        ]);
        let mut scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings());
        let shutdown = CancellationToken::new();

        scheduler.run_cycle(&shutdown).await;
        let before = scheduler.store().get().cloned();

        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::FetchFailed);
        assert_eq!(scheduler.store().get().cloned(), before);
        assert_eq!(scheduler.state(), CycleState::Backoff);
        assert_eq!(scheduler.consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_success_resets_failures() {
        let gateway = FakeGateway::with_polls(vec![
            Err(GatewayError::Status(502)),
            Err(GatewayError::Status(502)),
            Ok(vec![torrent("A", 1)]),
        ]);
        let mut scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings());
        let shutdown = CancellationToken::new();

        scheduler.run_cycle(&shutdown).await;
        scheduler.run_cycle(&shutdown).await;
        assert_eq!(scheduler.consecutive_failures(), 2);
        assert!(scheduler.store().is_baseline());

        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Reported);
        assert_eq!(scheduler.consecutive_failures(), 0);
        assert!(!scheduler.store().is_baseline());
    }

    #[tokio::test]
    async fn test_delivery_failure_advances_snapshot() {
        let gateway = FakeGateway::with_polls(vec![Ok(vec![torrent("A", 100)])]);
        let mut scheduler = Scheduler::new(gateway, FakeNotifier::failing(), settings());

        let outcome = scheduler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(outcome, CycleOutcome::DeliveryFailed);
        let stored = scheduler.store().get().unwrap();
        assert!(stored.contains(&TorrentId::new("A")));
        assert_eq!(scheduler.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn test_added_not_repeated_after_failed_delivery() {
        let gateway = FakeGateway::with_polls(vec![
            Ok(vec![torrent("A", 0)]),
            Ok(vec![torrent("A", 0), torrent("B", 0)]),
            Ok(vec![torrent("A", 0), torrent("B", 0)]),
        ]);
        let notifier = FakeNotifier::default();
        let (delivered, fail) = (notifier.delivered.clone(), notifier.fail.clone());
        let mut scheduler = Scheduler::new(gateway, notifier, settings());
        let shutdown = CancellationToken::new();

        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Reported);

        // B shows up while the sink is down
        fail.store(true, Ordering::SeqCst);
        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::DeliveryFailed);

        fail.store(false, Ordering::SeqCst);
        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Reported);

        let reports = delivered.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[1].added.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_ids_fail_cycle() {
        let gateway = FakeGateway::with_polls(vec![Ok(vec![torrent("A", 1), torrent("A", 2)])]);
        let notifier = FakeNotifier::default();
        let delivered = notifier.delivered.clone();
        let mut scheduler = Scheduler::new(gateway, notifier, settings());

        let outcome = scheduler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(outcome, CycleOutcome::FetchFailed);
        assert!(scheduler.store().is_baseline());
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auth_expiry_reauthenticates_once() {
        let gateway = FakeGateway::with_polls(vec![
            Ok(vec![torrent("A", 1)]),
            Err(GatewayError::AuthExpired),
            Ok(vec![torrent("A", 2)]),
        ]);
        let auth_calls = gateway.auth_calls.clone();
        let mut scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings());
        let shutdown = CancellationToken::new();

        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Reported);
        assert_eq!(auth_calls.load(Ordering::SeqCst), 1);

        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Reported);
        assert_eq!(auth_calls.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.session, Some(Session::new(2)));
    }

    #[tokio::test]
    async fn test_repeated_auth_expiry_is_fetch_failure() {
        let gateway = FakeGateway::with_polls(vec![
            Err(GatewayError::AuthExpired),
            Err(GatewayError::AuthExpired),
        ]);
        let mut scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings());

        let outcome = scheduler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(outcome, CycleOutcome::FetchFailed);
        assert!(scheduler.session.is_none());
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let gateway = FakeGateway {
            delay: Some(Duration::from_millis(500)),
            ..FakeGateway::with_polls(vec![Ok(vec![torrent("A", 1)])])
        };
        let mut scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings());

        let outcome = scheduler.run_cycle(&CancellationToken::new()).await;

        assert_eq!(outcome, CycleOutcome::FetchFailed);
        assert!(scheduler.store().is_baseline());
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch_has_no_effect() {
        let gateway = FakeGateway::with_polls(vec![Ok(vec![torrent("A", 1)])]);
        let mut scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert_eq!(scheduler.run_cycle(&shutdown).await, CycleOutcome::Cancelled);
        assert!(scheduler.store().is_baseline());
        assert_eq!(scheduler.state(), CycleState::Idle);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let notifier = FakeNotifier::default();
        let delivered = notifier.delivered.clone();
        let scheduler = Scheduler::new(FakeGateway::default(), notifier, settings());
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(70)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        let count = delivered.lock().unwrap().len();
        assert!(count >= 2, "expected several cycles, got {}", count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycle_defers_next() {
        let gateway = FakeGateway {
            delay: Some(Duration::from_secs(3)),
            ..FakeGateway::default()
        };
        let (calls, max_in_flight) = (gateway.calls.clone(), gateway.max_in_flight.clone());
        let settings = SchedulerSettings {
            interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(5),
            max_backoff: Duration::from_secs(8),
        };
        let scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(10)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let calls = calls.lock().unwrap();
        assert!(calls.len() >= 3, "expected several polls, got {}", calls.len());
        for gap in gaps(&calls) {
            assert!(gap >= Duration::from_secs(3), "poll started {:?} after the previous one", gap);
        }
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_polls_back_off_exponentially() {
        let gateway = FakeGateway {
            always_fail: true,
            ..FakeGateway::default()
        };
        let calls = gateway.calls.clone();
        let settings = SchedulerSettings {
            interval: Duration::from_secs(1),
            request_timeout: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        };
        let scheduler = Scheduler::new(gateway, FakeNotifier::default(), settings);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(20)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let gaps = gaps(&calls.lock().unwrap());
        assert!(gaps.len() >= 4, "expected at least five polls, got gaps {:?}", gaps);
        for (gap, base) in gaps.iter().zip([1u64, 2, 4, 8]) {
            let base = Duration::from_secs(base);
            assert!(
                *gap >= base && *gap <= base + base / 10,
                "gap {:?} outside {:?} plus 10%",
                gap,
                base
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_delivery_advances_snapshot() {
        let gateway = FakeGateway::with_polls(vec![Ok(vec![torrent("A", 100)])]);
        let notifier = StalledNotifier::default();
        let entered = notifier.entered.clone();
        let settings = SchedulerSettings {
            interval: Duration::from_secs(120),
            request_timeout: Duration::from_secs(60),
            max_backoff: Duration::from_secs(600),
        };
        let mut scheduler = Scheduler::new(gateway, notifier, settings);
        let shutdown = CancellationToken::new();

        let (outcome, _) = tokio::join!(scheduler.run_cycle(&shutdown), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            shutdown.cancel();
        });

        assert_eq!(outcome, CycleOutcome::DeliveryFailed);
        assert!(entered.load(Ordering::SeqCst));
        assert!(scheduler.store().get().unwrap().contains(&TorrentId::new("A")));
        assert_eq!(scheduler.state(), CycleState::Idle);
    }

    #[test]
    fn test_backoff_delay() {
        let interval = Duration::from_secs(30);
        let max = Duration::from_secs(600);

        assert_eq!(backoff_delay(0, interval, max), interval);
        assert_eq!(backoff_delay(1, interval, max), interval);
        assert_eq!(backoff_delay(2, interval, max), Duration::from_secs(60));
        assert_eq!(backoff_delay(3, interval, max), Duration::from_secs(120));
        assert_eq!(backoff_delay(6, interval, max), max);
        assert_eq!(backoff_delay(u32::MAX, interval, max), max);
    }

    #[test]
    fn test_jitter_bounds() {
        let delay = Duration::from_secs(10);
        for _ in 0..50 {
            let jittered = with_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered <= Duration::from_secs(11));
        }
    }
}
