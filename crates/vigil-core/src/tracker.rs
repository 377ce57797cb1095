//! Session tracking state machine.
//!
//! The tracker is either idle or holds exactly one open [`Session`]. Every transition returns
//! the reports it produced; persisting them and triggering delivery is the caller's job.

use tracing::{debug, trace};

use crate::domain::{ForegroundApp, PendingReport, Session, TransitionEvent, TransitionKind};
use crate::ports::PackageClassifier;

pub const DEFAULT_MIN_SESSION_MS: i64 = 1000;

pub struct SessionTracker {
    active: Option<Session>,
    last_processed_ms: i64,
    min_session_ms: i64,
}

impl SessionTracker {
    pub fn new(min_session_ms: i64) -> Self {
        Self {
            active: None,
            last_processed_ms: 0,
            min_session_ms,
        }
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn last_processed_ms(&self) -> i64 {
        self.last_processed_ms
    }

    /// Applies one raw transition. Events at or before the last processed timestamp are stale.
    pub fn apply(
        &mut self,
        event: &TransitionEvent,
        classifier: &dyn PackageClassifier,
    ) -> Vec<PendingReport> {
        if event.timestamp_ms <= self.last_processed_ms {
            trace!(
                package = %event.package,
                timestamp_ms = event.timestamp_ms,
                "skipping stale transition"
            );
            return Vec::new();
        }
        self.last_processed_ms = event.timestamp_ms;

        match event.kind {
            TransitionKind::ToForeground => {
                self.switch_to(&event.package, event.timestamp_ms, classifier)
            }
            TransitionKind::ToBackground => {
                let is_active = self
                    .active
                    .as_ref()
                    .map(|session| session.package == event.package)
                    .unwrap_or(false);

                if is_active {
                    self.close_active(event.timestamp_ms, classifier)
                        .into_iter()
                        .collect()
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Reconciles with the most recently used application, treating disagreement as an
    /// implicit foreground switch at `now_ms`.
    pub fn observe_foreground(
        &mut self,
        foreground: &ForegroundApp,
        now_ms: i64,
        classifier: &dyn PackageClassifier,
    ) -> Vec<PendingReport> {
        let agrees = self
            .active
            .as_ref()
            .map(|session| session.package == foreground.package)
            .unwrap_or(false);

        if agrees {
            return Vec::new();
        }

        debug!(package = %foreground.package, now_ms, "implicit foreground switch");
        self.switch_to(&foreground.package, now_ms, classifier)
    }

    /// Closes any open session; used when tracking stops.
    pub fn stop(&mut self, now_ms: i64, classifier: &dyn PackageClassifier) -> Vec<PendingReport> {
        self.close_active(now_ms, classifier).into_iter().collect()
    }

    fn switch_to(
        &mut self,
        package: &str,
        at_ms: i64,
        classifier: &dyn PackageClassifier,
    ) -> Vec<PendingReport> {
        let mut reports = Vec::new();

        if !classifier.is_trackable(package) {
            reports.extend(self.close_active(at_ms, classifier));
            return reports;
        }

        if let Some(session) = &self.active {
            if session.package == package {
                return reports;
            }
        }

        reports.extend(self.close_active(at_ms, classifier));

        debug!(package, at_ms, "session opened");
        self.active = Some(Session::open(package, at_ms));
        reports.push(PendingReport::session_enter(
            package,
            &classifier.display_name(package),
            at_ms,
        ));

        reports
    }

    fn close_active(
        &mut self,
        end_ms: i64,
        classifier: &dyn PackageClassifier,
    ) -> Option<PendingReport> {
        let mut session = self.active.take()?;
        session.close(end_ms);

        let duration_ms = session.duration_ms().unwrap_or(0);
        if duration_ms < self.min_session_ms {
            debug!(
                package = %session.package,
                duration_ms,
                "discarding session shorter than threshold"
            );
            return None;
        }

        debug!(package = %session.package, duration_ms, "session closed");
        Some(PendingReport::session_closed(
            &session.package,
            &classifier.display_name(&session.package),
            session.start_ms,
            session.end_ms.unwrap_or(session.start_ms),
        ))
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SESSION_MS)
    }
}
