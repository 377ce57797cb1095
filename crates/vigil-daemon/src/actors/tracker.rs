use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use vigil_core::{
    Clock, EventSource, Interruption, InterruptionDetector, PackageClassifier, PendingReport,
    ReportOutbox, SessionTracker, TrackingConfig,
};

use super::{DeliveryHandle, NotifierHandle};

const ENQUEUE_ATTEMPTS: u32 = 3;
const ENQUEUE_RETRY_DELAY: Duration = Duration::from_millis(50);

pub enum TrackerMessage {
    Start {
        reply: oneshot::Sender<()>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    GetStatus {
        reply: oneshot::Sender<TrackerStatus>,
    },
    CheckInterruption {
        reply: oneshot::Sender<Result<Option<Interruption>, String>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerStatus {
    pub running: bool,
    pub active_package: Option<String>,
    pub active_since_ms: Option<i64>,
    pub pending_reports: u64,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub sampling_interval: Duration,
    pub heartbeat_interval: Duration,
    pub lookback_window_ms: i64,
    pub recent_window_ms: i64,
}

impl TrackerSettings {
    pub fn from_config(tracking: &TrackingConfig, heartbeat_interval_seconds: u64) -> Self {
        Self {
            sampling_interval: Duration::from_secs(tracking.sampling_interval_seconds.max(1)),
            heartbeat_interval: Duration::from_secs(heartbeat_interval_seconds.max(1)),
            lookback_window_ms: (tracking.lookback_window_seconds * 1000) as i64,
            recent_window_ms: (tracking.recent_window_seconds * 1000) as i64,
        }
    }
}

#[derive(Clone)]
pub struct TrackerHandle {
    sender: mpsc::Sender<TrackerMessage>,
}

impl TrackerHandle {
    pub async fn start(&self) -> Option<()> {
        let (reply, receiver) = oneshot::channel();
        self.sender.send(TrackerMessage::Start { reply }).await.ok()?;
        receiver.await.ok()
    }

    pub async fn stop(&self) -> Option<()> {
        let (reply, receiver) = oneshot::channel();
        self.sender.send(TrackerMessage::Stop { reply }).await.ok()?;
        receiver.await.ok()
    }

    pub async fn get_status(&self) -> Option<TrackerStatus> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(TrackerMessage::GetStatus { reply })
            .await
            .ok()?;
        receiver.await.ok()
    }

    pub async fn check_interruption(&self) -> Option<Result<Option<Interruption>, String>> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(TrackerMessage::CheckInterruption { reply })
            .await
            .ok()?;
        receiver.await.ok()
    }
}

/// Sole owner of the session state. Sampling and heartbeat tickers exist only while running.
pub struct TrackerActor {
    receiver: mpsc::Receiver<TrackerMessage>,
    source: Box<dyn EventSource>,
    classifier: Arc<dyn PackageClassifier>,
    outbox: Arc<dyn ReportOutbox>,
    detector: InterruptionDetector,
    clock: Arc<dyn Clock>,
    delivery: DeliveryHandle,
    notifier: Option<NotifierHandle>,
    settings: TrackerSettings,
    tracker: SessionTracker,
    sampling: Option<Interval>,
    heartbeat: Option<Interval>,
}

pub struct TrackerDependencies {
    pub source: Box<dyn EventSource>,
    pub classifier: Arc<dyn PackageClassifier>,
    pub outbox: Arc<dyn ReportOutbox>,
    pub detector: InterruptionDetector,
    pub clock: Arc<dyn Clock>,
    pub delivery: DeliveryHandle,
    pub notifier: Option<NotifierHandle>,
}

impl TrackerActor {
    pub fn new(
        dependencies: TrackerDependencies,
        settings: TrackerSettings,
        min_session_ms: i64,
    ) -> (Self, TrackerHandle) {
        let (sender, receiver) = mpsc::channel(32);

        let actor = Self {
            receiver,
            source: dependencies.source,
            classifier: dependencies.classifier,
            outbox: dependencies.outbox,
            detector: dependencies.detector,
            clock: dependencies.clock,
            delivery: dependencies.delivery,
            notifier: dependencies.notifier,
            settings,
            tracker: SessionTracker::new(min_session_ms),
            sampling: None,
            heartbeat: None,
        };

        let handle = TrackerHandle { sender };

        (actor, handle)
    }

    pub async fn run(mut self) {
        info!("tracker actor started");

        loop {
            tokio::select! {
                message = self.receiver.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        None => break,
                    }
                }
                _ = next_tick(&mut self.sampling) => {
                    self.sample();
                }
                _ = next_tick(&mut self.heartbeat) => {
                    self.beat();
                }
            }
        }

        if self.is_running() {
            self.stop();
        }

        debug!("tracker actor stopped");
    }

    fn is_running(&self) -> bool {
        self.sampling.is_some()
    }

    fn handle_message(&mut self, message: TrackerMessage) {
        match message {
            TrackerMessage::Start { reply } => {
                self.start();
                let _ = reply.send(());
            }
            TrackerMessage::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            TrackerMessage::GetStatus { reply } => {
                let _ = reply.send(self.current_status());
            }
            TrackerMessage::CheckInterruption { reply } => {
                let _ = reply.send(self.check_interruption());
            }
        }
    }

    fn start(&mut self) {
        if self.is_running() {
            debug!("tracking already running");
            return;
        }

        // Before the first heartbeat, so a restart after a kill reports the gap.
        if let Err(message) = self.check_interruption() {
            warn!(error = %message, "interruption check failed on start");
        }
        self.beat();

        let mut sampling = tokio::time::interval(self.settings.sampling_interval);
        sampling.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let heartbeat_period = self.settings.heartbeat_interval;
        let mut heartbeat =
            tokio::time::interval_at(Instant::now() + heartbeat_period, heartbeat_period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.sampling = Some(sampling);
        self.heartbeat = Some(heartbeat);

        info!("tracking started");
    }

    fn stop(&mut self) {
        if !self.is_running() {
            debug!("tracking already stopped");
            return;
        }

        self.sampling = None;
        self.heartbeat = None;

        let now_ms = self.clock.now_ms();
        let reports = self.tracker.stop(now_ms, self.classifier.as_ref());
        self.persist(reports);

        info!("tracking stopped");
    }

    fn sample(&mut self) {
        let now_ms = self.clock.now_ms();
        let since_ms = self
            .tracker
            .last_processed_ms()
            .max(now_ms - self.settings.lookback_window_ms);

        let mut reports = Vec::new();

        match self.source.poll_transitions(since_ms, now_ms) {
            Ok(events) => {
                trace!(count = events.len(), since_ms, now_ms, "polled transitions");
                for event in &events {
                    reports.extend(self.tracker.apply(event, self.classifier.as_ref()));
                }
            }
            Err(error) => warn!(%error, "failed to poll transitions"),
        }

        match self
            .source
            .most_recent_foreground(self.settings.recent_window_ms)
        {
            Ok(Some(foreground)) => {
                reports.extend(self.tracker.observe_foreground(
                    &foreground,
                    now_ms,
                    self.classifier.as_ref(),
                ));
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "failed to query most recent foreground"),
        }

        self.persist(reports);
    }

    fn beat(&mut self) {
        let now_ms = self.clock.now_ms();
        if let Err(error) = self.detector.beat(now_ms) {
            warn!(%error, "failed to record heartbeat");
        }

        // Periodic retry for reports left behind by a failed flush.
        self.delivery.request_flush();
    }

    fn check_interruption(&mut self) -> Result<Option<Interruption>, String> {
        let now_ms = self.clock.now_ms();
        match self.detector.check(now_ms) {
            Ok(Some(interruption)) => {
                self.delivery.request_flush();
                Ok(Some(interruption))
            }
            Ok(None) => Ok(None),
            Err(error) => {
                error!(%error, "interruption check failed");
                self.raise_alarm(&format!("Interruption check failed: {}", error));
                Err(error.to_string())
            }
        }
    }

    fn persist(&mut self, reports: Vec<PendingReport>) {
        if reports.is_empty() {
            return;
        }

        let mut enqueued = 0;
        for report in &reports {
            if self.enqueue_with_retry(report) {
                enqueued += 1;
            }
        }

        if enqueued > 0 {
            self.delivery.request_flush();
        }
    }

    fn enqueue_with_retry(&self, report: &PendingReport) -> bool {
        let mut last_error = None;

        for attempt in 1..=ENQUEUE_ATTEMPTS {
            match self.outbox.enqueue(report) {
                Ok(()) => {
                    debug!(id = %report.id, kind = %report.kind, "report enqueued");
                    return true;
                }
                Err(error) => {
                    warn!(%error, id = %report.id, attempt, "failed to enqueue report");
                    last_error = Some(error);
                }
            }

            // Gives a briefly locked database a chance to clear.
            if attempt < ENQUEUE_ATTEMPTS {
                std::thread::sleep(ENQUEUE_RETRY_DELAY);
            }
        }

        if let Some(error) = last_error {
            error!(%error, id = %report.id, "report could not be persisted");
            self.raise_alarm(&format!("Report {} could not be saved: {}", report.id, error));
        }

        false
    }

    fn raise_alarm(&self, body: &str) {
        if let Some(ref notifier) = self.notifier {
            notifier.send_alarm("Vigil - Storage failure", body);
        }
    }

    fn current_status(&self) -> TrackerStatus {
        let active = self.tracker.active_session();
        let pending_reports = self.outbox.count_pending().unwrap_or_else(|error| {
            warn!(%error, "failed to count pending reports");
            0
        });

        TrackerStatus {
            running: self.is_running(),
            active_package: active.map(|session| session.package.clone()),
            active_since_ms: active.map(|session| session.start_ms),
            pending_reports,
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::notifier::NotifierMessage;
    use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
    use vigil_adapters::{
        RecordingSink, ScriptedEventSource, SqliteHeartbeatStore, SqliteReportOutbox,
        StaticCredentials,
    };
    use vigil_core::{
        DeliveryPipeline, HeartbeatMark, HeartbeatStore, OutboxError, ReportKind,
        TransitionEvent,
    };

    const FIVE_MINUTES_MS: i64 = 5 * 60 * 1000;
    const T: i64 = 1_700_000_000_000;

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn at(now_ms: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(now_ms)))
        }

        fn set(&self, now_ms: i64) {
            self.0.store(now_ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct TrackAll;

    impl PackageClassifier for TrackAll {
        fn is_trackable(&self, package: &str) -> bool {
            package != "vigil"
        }

        fn display_name(&self, package: &str) -> String {
            package.to_uppercase()
        }
    }

    struct Fixture {
        handle: TrackerHandle,
        source: ScriptedEventSource,
        outbox: Arc<SqliteReportOutbox>,
        heartbeat: Arc<SqliteHeartbeatStore>,
        clock: Arc<ManualClock>,
    }

    /// Delivery is left unconfigured so enqueued reports stay in the outbox for inspection.
    fn spawn_tracker(now_ms: i64, heartbeat: Option<i64>) -> Fixture {
        let source = ScriptedEventSource::new();
        let outbox = Arc::new(SqliteReportOutbox::in_memory().unwrap());
        let heartbeat_store = Arc::new(SqliteHeartbeatStore::in_memory().unwrap());
        if let Some(last_seen_ms) = heartbeat {
            heartbeat_store.record(HeartbeatMark::at(last_seen_ms)).unwrap();
        }
        let clock = ManualClock::at(now_ms);

        let delivery = DeliveryHandle::new(Arc::new(DeliveryPipeline::new(
            outbox.clone(),
            Arc::new(RecordingSink::new()),
            Arc::new(StaticCredentials::missing()),
        )));

        let (actor, handle) = TrackerActor::new(
            TrackerDependencies {
                source: Box::new(source.clone()),
                classifier: Arc::new(TrackAll),
                outbox: outbox.clone(),
                detector: InterruptionDetector::new(
                    heartbeat_store.clone(),
                    outbox.clone(),
                    FIVE_MINUTES_MS,
                ),
                clock: clock.clone(),
                delivery,
                notifier: None,
            },
            TrackerSettings {
                sampling_interval: Duration::from_millis(20),
                heartbeat_interval: Duration::from_secs(60),
                lookback_window_ms: 60_000,
                recent_window_ms: 60_000,
            },
            1000,
        );
        tokio::spawn(actor.run());

        Fixture {
            handle,
            source,
            outbox,
            heartbeat: heartbeat_store,
            clock,
        }
    }

    fn pending_ids(outbox: &SqliteReportOutbox) -> Vec<String> {
        outbox
            .list_pending()
            .unwrap()
            .into_iter()
            .map(|report| report.id)
            .collect()
    }

    #[tokio::test]
    async fn start_and_stop_toggle_running() {
        let fixture = spawn_tracker(T, None);

        assert!(!fixture.handle.get_status().await.unwrap().running);

        fixture.handle.start().await.unwrap();
        assert!(fixture.handle.get_status().await.unwrap().running);

        fixture.handle.stop().await.unwrap();
        assert!(!fixture.handle.get_status().await.unwrap().running);
    }

    #[tokio::test]
    async fn start_records_heartbeat() {
        let fixture = spawn_tracker(T, None);

        fixture.handle.start().await.unwrap();

        assert_eq!(fixture.heartbeat.last().unwrap(), Some(HeartbeatMark::at(T)));
    }

    #[tokio::test]
    async fn sampling_turns_transitions_into_reports() {
        let fixture = spawn_tracker(T + 10_000, None);
        fixture
            .source
            .push(TransitionEvent::to_foreground("com.a", T + 1000));
        fixture
            .source
            .push(TransitionEvent::to_foreground("com.b", T + 5000));

        fixture.handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let expected_ids = vec![
            format!("enter_{}_com.a", T + 1000),
            format!("enter_{}_com.b", T + 5000),
            format!("session_{}_com.a", T + 5000),
        ];
        let mut ids = pending_ids(&fixture.outbox);
        ids.sort();
        let mut expected = expected_ids.clone();
        expected.sort();
        assert_eq!(ids, expected);

        let status = fixture.handle.get_status().await.unwrap();
        assert_eq!(status.active_package.as_deref(), Some("com.b"));
        assert_eq!(status.active_since_ms, Some(T + 5000));
        assert_eq!(status.pending_reports, 3);
    }

    #[tokio::test]
    async fn stop_closes_the_open_session() {
        let fixture = spawn_tracker(T + 10_000, None);
        fixture
            .source
            .push(TransitionEvent::to_foreground("com.a", T + 1000));

        fixture.handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fixture.clock.set(T + 20_000);
        fixture.handle.stop().await.unwrap();

        let pending = fixture.outbox.list_pending().unwrap();
        let closed = pending
            .iter()
            .find(|report| report.kind == ReportKind::SessionClosed)
            .unwrap();
        assert_eq!(closed.id, format!("session_{}_com.a", T + 20_000));

        let status = fixture.handle.get_status().await.unwrap();
        assert!(status.active_package.is_none());
    }

    #[tokio::test]
    async fn start_reports_gap_before_first_heartbeat() {
        let fixture = spawn_tracker(T + 301_000, Some(T));

        fixture.handle.start().await.unwrap();

        assert_eq!(pending_ids(&fixture.outbox), vec![format!("interruption_{}", T)]);
        assert_eq!(
            fixture.heartbeat.last().unwrap(),
            Some(HeartbeatMark::at(T + 301_000))
        );
    }

    #[tokio::test]
    async fn check_interruption_works_while_stopped() {
        let fixture = spawn_tracker(T + 301_000, Some(T));

        let interruption = fixture.handle.check_interruption().await.unwrap().unwrap();

        assert_eq!(
            interruption,
            Some(Interruption {
                from_ms: T,
                to_ms: T + 301_000,
                duration_ms: 301_000,
            })
        );
        assert!(!fixture.handle.get_status().await.unwrap().running);
    }

    #[tokio::test]
    async fn short_gap_is_not_an_interruption() {
        let fixture = spawn_tracker(T + 299_000, Some(T));

        let interruption = fixture.handle.check_interruption().await.unwrap().unwrap();

        assert!(interruption.is_none());
        assert_eq!(fixture.outbox.count_pending().unwrap(), 0);
    }

    #[tokio::test]
    async fn samples_stop_after_stop() {
        let fixture = spawn_tracker(T + 10_000, None);

        fixture.handle.start().await.unwrap();
        fixture.handle.stop().await.unwrap();

        fixture
            .source
            .push(TransitionEvent::to_foreground("com.a", T + 9000));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fixture.outbox.count_pending().unwrap(), 0);
    }

    #[derive(Default)]
    struct BrokenOutbox {
        attempts: AtomicU32,
    }

    impl ReportOutbox for BrokenOutbox {
        fn enqueue(&self, _report: &PendingReport) -> Result<(), OutboxError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(OutboxError::Storage {
                message: "database is locked".to_string(),
            })
        }

        fn list_pending(&self) -> Result<Vec<PendingReport>, OutboxError> {
            Ok(Vec::new())
        }

        fn acknowledge(&self, _id: &str) -> Result<(), OutboxError> {
            Ok(())
        }

        fn count_pending(&self) -> Result<u64, OutboxError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn persistent_enqueue_failure_raises_one_alarm() {
        let source = ScriptedEventSource::new();
        source.push(TransitionEvent::to_foreground("com.a", T + 1000));
        let outbox = Arc::new(BrokenOutbox::default());
        let (notifier, mut alarms) = NotifierHandle::capturing();

        let delivery = DeliveryHandle::new(Arc::new(DeliveryPipeline::new(
            outbox.clone(),
            Arc::new(RecordingSink::new()),
            Arc::new(StaticCredentials::missing()),
        )));
        let (actor, handle) = TrackerActor::new(
            TrackerDependencies {
                source: Box::new(source.clone()),
                classifier: Arc::new(TrackAll),
                outbox: outbox.clone(),
                detector: InterruptionDetector::new(
                    Arc::new(SqliteHeartbeatStore::in_memory().unwrap()),
                    outbox.clone(),
                    FIVE_MINUTES_MS,
                ),
                clock: ManualClock::at(T + 10_000),
                delivery,
                notifier: Some(notifier),
            },
            TrackerSettings {
                sampling_interval: Duration::from_secs(3600),
                heartbeat_interval: Duration::from_secs(3600),
                lookback_window_ms: 60_000,
                recent_window_ms: 60_000,
            },
            1000,
        );
        tokio::spawn(actor.run());

        // The first sampling tick fires on start and yields one enter report.
        handle.start().await.unwrap();
        let alarm = tokio::time::timeout(Duration::from_secs(2), alarms.recv())
            .await
            .unwrap()
            .unwrap();

        let NotifierMessage::Alarm { title, body } = alarm;
        assert_eq!(title, "Vigil - Storage failure");
        assert!(body.contains(&format!("enter_{}_com.a", T + 1000)));
        assert_eq!(outbox.attempts.load(Ordering::SeqCst), ENQUEUE_ATTEMPTS);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(alarms.try_recv().is_err());
        assert!(handle.get_status().await.unwrap().running);
    }
}
