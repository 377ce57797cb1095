//! Ordered, at-least-once delivery of outbox reports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ports::{CredentialSource, NotificationSink, ReportOutbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushOutcome {
    /// Another flush held the in-flight flag.
    Busy,
    NotConfigured,
    Completed { delivered: usize },
    /// Stopped at the first failed delivery; `remaining` includes the failed report.
    Halted { delivered: usize, remaining: usize },
    StorageUnavailable,
}

pub struct DeliveryPipeline {
    outbox: Arc<dyn ReportOutbox>,
    sink: Arc<dyn NotificationSink>,
    credentials: Arc<dyn CredentialSource>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DeliveryPipeline {
    pub fn new(
        outbox: Arc<dyn ReportOutbox>,
        sink: Arc<dyn NotificationSink>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            outbox,
            sink,
            credentials,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_flushing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Drains the outbox oldest first and stops at the first failed delivery.
    ///
    /// Blocking: runs the sink synchronously for every report. Only one flush proceeds at a
    /// time; concurrent callers get [`FlushOutcome::Busy`] without touching the outbox.
    pub fn flush(&self) -> FlushOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("flush already in progress");
            return FlushOutcome::Busy;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let Some(credentials) = self.credentials.resolve() else {
            debug!("delivery credentials missing, skipping flush");
            return FlushOutcome::NotConfigured;
        };

        let mut reports = match self.outbox.list_pending() {
            Ok(reports) => reports,
            Err(error) => {
                warn!(%error, "failed to list pending reports");
                return FlushOutcome::StorageUnavailable;
            }
        };
        reports.sort_by_key(|report| report.timestamp_ms);

        let total = reports.len();
        let mut delivered = 0;

        for report in &reports {
            if let Err(error) = self.sink.deliver(&credentials, &report.render_message()) {
                warn!(%error, id = %report.id, "delivery failed, keeping report pending");
                return FlushOutcome::Halted {
                    delivered,
                    remaining: total - delivered,
                };
            }

            // Already delivered: a failed acknowledge means the report may be sent again.
            if let Err(error) = self.outbox.acknowledge(&report.id) {
                warn!(%error, id = %report.id, "failed to acknowledge delivered report");
                return FlushOutcome::StorageUnavailable;
            }

            delivered += 1;
            debug!(id = %report.id, kind = %report.kind, "report delivered");
        }

        if delivered > 0 {
            info!(delivered, "flush completed");
        }

        FlushOutcome::Completed { delivered }
    }
}
