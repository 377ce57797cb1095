use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::{HeartbeatMark, Interruption, PendingReport};
use crate::ports::{HeartbeatStore, HeartbeatStoreError, OutboxError, ReportOutbox};

pub const DEFAULT_INTERRUPTION_THRESHOLD_MS: i64 = 5 * 60 * 1000;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error(transparent)]
    Heartbeat(#[from] HeartbeatStoreError),

    #[error(transparent)]
    Outbox(#[from] OutboxError),
}

/// Stamps liveness and turns stale heartbeats into interruption reports.
pub struct InterruptionDetector {
    store: Arc<dyn HeartbeatStore>,
    outbox: Arc<dyn ReportOutbox>,
    threshold_ms: i64,
}

impl InterruptionDetector {
    pub fn new(
        store: Arc<dyn HeartbeatStore>,
        outbox: Arc<dyn ReportOutbox>,
        threshold_ms: i64,
    ) -> Self {
        Self {
            store,
            outbox,
            threshold_ms,
        }
    }

    pub fn beat(&self, now_ms: i64) -> Result<(), HeartbeatStoreError> {
        self.store.record(HeartbeatMark::at(now_ms))?;
        debug!(now_ms, "heartbeat");
        Ok(())
    }

    /// Compares the last heartbeat with `now_ms` and enqueues an interruption when the gap
    /// exceeds the threshold.
    ///
    /// The mark is advanced before the report is enqueued, so a failed advance leaves nothing
    /// behind and the next check reports the same gap exactly once. A failed enqueue puts the
    /// previous mark back so the gap is not lost.
    pub fn check(&self, now_ms: i64) -> Result<Option<Interruption>, DetectorError> {
        let Some(mark) = self.store.last()? else {
            debug!("no heartbeat recorded yet");
            return Ok(None);
        };

        let Some(interruption) = Interruption::detect(mark.last_seen_ms, now_ms, self.threshold_ms)
        else {
            return Ok(None);
        };

        self.store.record(HeartbeatMark::at(now_ms))?;

        let report = PendingReport::interruption(
            interruption.from_ms,
            interruption.to_ms,
            interruption.duration_ms,
        );
        if let Err(error) = self.outbox.enqueue(&report) {
            if let Err(restore_error) = self.store.record(mark) {
                error!(
                    %restore_error,
                    from_ms = mark.last_seen_ms,
                    "interruption lost, heartbeat could not be restored"
                );
            }
            return Err(error.into());
        }

        info!(
            from_ms = interruption.from_ms,
            to_ms = interruption.to_ms,
            minutes = interruption.duration_ms / 60_000,
            "monitoring interruption detected"
        );

        Ok(Some(interruption))
    }
}
