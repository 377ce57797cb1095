//! Foreground sampling for the Linux desktop.
//!
//! The X server has no transition log, so the source samples the focused window and
//! synthesizes transitions into a bounded [`FocusHistory`].

#[cfg(target_os = "linux")]
mod x11_source;

use std::collections::VecDeque;

use vigil_core::{EventSource, EventSourceError, ForegroundApp, TransitionEvent};

#[cfg(target_os = "linux")]
pub use x11_source::X11EventSource;

pub struct FocusHistory {
    events: VecDeque<TransitionEvent>,
    current: Option<String>,
    last_sample_ms: i64,
    retention_ms: i64,
}

impl FocusHistory {
    pub fn new(retention_ms: i64) -> Self {
        Self {
            events: VecDeque::new(),
            current: None,
            last_sample_ms: 0,
            retention_ms,
        }
    }

    /// Records the focused application seen at `now_ms`.
    ///
    /// A switch yields a single `ToForeground`; the tracker closes the previous session on it.
    /// Losing focus entirely yields a `ToBackground` for the last application.
    pub fn record(&mut self, focused: Option<String>, now_ms: i64) {
        if now_ms < self.last_sample_ms {
            return;
        }
        self.last_sample_ms = now_ms;

        if focused == self.current {
            return;
        }

        match (&self.current, &focused) {
            (_, Some(package)) => self
                .events
                .push_back(TransitionEvent::to_foreground(package.clone(), now_ms)),
            (Some(previous), None) => self
                .events
                .push_back(TransitionEvent::to_background(previous.clone(), now_ms)),
            (None, None) => {}
        }
        self.current = focused;

        while let Some(oldest) = self.events.front() {
            if oldest.timestamp_ms >= now_ms - self.retention_ms {
                break;
            }
            self.events.pop_front();
        }
    }

    pub fn events_between(&self, since_ms: i64, now_ms: i64) -> Vec<TransitionEvent> {
        self.events
            .iter()
            .filter(|event| event.timestamp_ms > since_ms && event.timestamp_ms <= now_ms)
            .cloned()
            .collect()
    }

    /// The focused application, if it was seen within `window_ms` of `now_ms`.
    pub fn most_recent(&self, window_ms: i64, now_ms: i64) -> Option<ForegroundApp> {
        let package = self.current.as_ref()?;
        if now_ms - self.last_sample_ms > window_ms {
            return None;
        }

        Some(ForegroundApp::new(package.clone(), self.last_sample_ms))
    }
}

type SourceFactory = Box<dyn FnMut() -> Option<Box<dyn EventSource>> + Send>;

const RECONNECT_INTERVAL_MS: i64 = 30_000;

/// Keeps tracking alive across display server absence and restarts.
///
/// While no source is connected every tick is skipped and a new connection is attempted at
/// most once per `retry_interval_ms`. A query failure drops the connection so the next due
/// tick rebuilds it.
pub struct ReconnectingEventSource {
    factory: SourceFactory,
    inner: Option<Box<dyn EventSource>>,
    retry_interval_ms: i64,
    last_attempt_ms: Option<i64>,
}

impl ReconnectingEventSource {
    pub fn new(factory: SourceFactory, retry_interval_ms: i64) -> Self {
        Self {
            factory,
            inner: None,
            retry_interval_ms,
            last_attempt_ms: None,
        }
    }

    fn connect_if_due(&mut self, now_ms: i64) {
        if self.inner.is_some() {
            return;
        }
        if let Some(last_attempt_ms) = self.last_attempt_ms {
            if now_ms - last_attempt_ms < self.retry_interval_ms {
                return;
            }
        }

        let first_attempt = self.last_attempt_ms.is_none();
        self.last_attempt_ms = Some(now_ms);
        self.inner = (self.factory)();

        match (&self.inner, first_attempt) {
            (Some(_), true) => tracing::debug!("event source connected"),
            (Some(_), false) => tracing::info!("event source reconnected"),
            (None, true) => tracing::warn!(
                retry_ms = self.retry_interval_ms,
                "event source not available, tracking idles until it appears"
            ),
            (None, false) => tracing::debug!("event source still unavailable"),
        }
    }

    fn disconnect(&mut self, error: &EventSourceError) {
        tracing::warn!(%error, "event source lost, reconnecting");
        self.inner = None;
    }
}

impl EventSource for ReconnectingEventSource {
    fn poll_transitions(
        &mut self,
        since_ms: i64,
        now_ms: i64,
    ) -> Result<Vec<TransitionEvent>, EventSourceError> {
        self.connect_if_due(now_ms);

        let Some(source) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };

        let result = source.poll_transitions(since_ms, now_ms);
        if let Err(error) = &result {
            self.disconnect(error);
        }
        result
    }

    fn most_recent_foreground(
        &mut self,
        window_ms: i64,
    ) -> Result<Option<ForegroundApp>, EventSourceError> {
        let Some(source) = self.inner.as_mut() else {
            return Ok(None);
        };

        let result = source.most_recent_foreground(window_ms);
        if let Err(error) = &result {
            self.disconnect(error);
        }
        result
    }
}

#[cfg(target_os = "linux")]
pub fn create_event_source(history_retention_ms: i64) -> Box<dyn EventSource> {
    Box::new(ReconnectingEventSource::new(
        Box::new(move || {
            X11EventSource::new(history_retention_ms)
                .map(|source| Box::new(source) as Box<dyn EventSource>)
        }),
        RECONNECT_INTERVAL_MS,
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn create_event_source(_history_retention_ms: i64) -> Box<dyn EventSource> {
    tracing::debug!("no window event source for this platform");
    Box::new(ReconnectingEventSource::new(
        Box::new(|| None),
        RECONNECT_INTERVAL_MS,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focused(package: &str) -> Option<String> {
        Some(package.to_string())
    }

    #[test]
    fn switch_yields_single_foreground_event() {
        let mut history = FocusHistory::new(10_000);

        history.record(focused("firefox"), 1000);
        history.record(focused("firefox"), 2000);
        history.record(focused("alacritty"), 3000);

        assert_eq!(
            history.events_between(0, 3000),
            vec![
                TransitionEvent::to_foreground("firefox", 1000),
                TransitionEvent::to_foreground("alacritty", 3000),
            ]
        );
    }

    #[test]
    fn losing_focus_yields_background_event() {
        let mut history = FocusHistory::new(10_000);

        history.record(focused("firefox"), 1000);
        history.record(None, 4000);
        history.record(None, 5000);

        assert_eq!(
            history.events_between(1000, 5000),
            vec![TransitionEvent::to_background("firefox", 4000)]
        );
        assert_eq!(history.most_recent(60_000, 5000), None);
    }

    #[test]
    fn old_events_are_dropped() {
        let mut history = FocusHistory::new(10_000);

        history.record(focused("firefox"), 1000);
        history.record(focused("alacritty"), 20_000);

        assert_eq!(
            history.events_between(0, 20_000),
            vec![TransitionEvent::to_foreground("alacritty", 20_000)]
        );
    }

    #[test]
    fn most_recent_respects_window() {
        let mut history = FocusHistory::new(10_000);
        history.record(focused("firefox"), 1000);

        assert_eq!(
            history.most_recent(60_000, 30_000),
            Some(ForegroundApp::new("firefox", 1000))
        );
        assert_eq!(history.most_recent(60_000, 70_000), None);
    }

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use vigil_adapters::ScriptedEventSource;

    /// A display that can be plugged in later; counts connection attempts.
    #[derive(Clone, Default)]
    struct Display {
        source: Arc<Mutex<Option<ScriptedEventSource>>>,
        attempts: Arc<AtomicUsize>,
    }

    impl Display {
        fn plug(&self, source: &ScriptedEventSource) {
            *self.source.lock().unwrap() = Some(source.clone());
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn reconnecting(&self, retry_interval_ms: i64) -> ReconnectingEventSource {
            let display = self.clone();
            ReconnectingEventSource::new(
                Box::new(move || {
                    display.attempts.fetch_add(1, Ordering::SeqCst);
                    display
                        .source
                        .lock()
                        .unwrap()
                        .clone()
                        .map(|source| Box::new(source) as Box<dyn EventSource>)
                }),
                retry_interval_ms,
            )
        }
    }

    #[test]
    fn missing_display_skips_ticks_and_retries() {
        let display = Display::default();
        let mut source = display.reconnecting(30_000);

        assert_eq!(source.poll_transitions(0, 1000).unwrap(), vec![]);
        assert_eq!(source.most_recent_foreground(60_000).unwrap(), None);
        assert_eq!(source.poll_transitions(1000, 6000).unwrap(), vec![]);
        assert_eq!(display.attempts(), 1);

        let x11 = ScriptedEventSource::new();
        x11.push(TransitionEvent::to_foreground("firefox", 40_000));
        display.plug(&x11);

        assert_eq!(
            source.poll_transitions(6000, 41_000).unwrap(),
            vec![TransitionEvent::to_foreground("firefox", 40_000)]
        );
        assert_eq!(display.attempts(), 2);
    }

    #[test]
    fn query_failure_rebuilds_the_connection() {
        let display = Display::default();
        let x11 = ScriptedEventSource::new();
        display.plug(&x11);
        let mut source = display.reconnecting(30_000);

        assert!(source.poll_transitions(0, 1000).is_ok());
        x11.set_failing(true);
        assert!(matches!(
            source.poll_transitions(1000, 6000),
            Err(EventSourceError::Query { .. })
        ));

        x11.set_failing(false);
        x11.push(TransitionEvent::to_foreground("alacritty", 35_000));

        assert_eq!(source.poll_transitions(6000, 11_000).unwrap(), vec![]);
        assert_eq!(display.attempts(), 1);

        assert_eq!(
            source.poll_transitions(11_000, 36_000).unwrap(),
            vec![TransitionEvent::to_foreground("alacritty", 35_000)]
        );
        assert_eq!(display.attempts(), 2);
    }
}

