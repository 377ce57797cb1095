use std::sync::Arc;

use tracing::{debug, error};

use vigil_core::{DeliveryPipeline, FlushOutcome};

/// Runs pipeline flushes on the blocking pool, away from the sampling task.
#[derive(Clone)]
pub struct DeliveryHandle {
    pipeline: Arc<DeliveryPipeline>,
}

impl DeliveryHandle {
    pub fn new(pipeline: Arc<DeliveryPipeline>) -> Self {
        Self { pipeline }
    }

    /// Fire-and-forget flush used after enqueues and on heartbeat ticks.
    pub fn request_flush(&self) {
        let pipeline = self.pipeline.clone();
        tokio::task::spawn_blocking(move || {
            let outcome = pipeline.flush();
            debug!(?outcome, "background flush finished");
        });
    }

    pub async fn flush_now(&self) -> FlushOutcome {
        let pipeline = self.pipeline.clone();
        match tokio::task::spawn_blocking(move || pipeline.flush()).await {
            Ok(outcome) => outcome,
            Err(error) => {
                error!(%error, "flush task failed");
                FlushOutcome::StorageUnavailable
            }
        }
    }
}
