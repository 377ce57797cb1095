use thiserror::Error;

use crate::domain::PendingReport;

#[derive(Error, Debug)]
pub enum OutboxError {
    #[error("outbox storage error: {message}")]
    Storage { message: String },

    #[error("corrupted report {id}: {message}")]
    Corrupted { id: String, message: String },
}

/// Durable store of reports awaiting delivery.
pub trait ReportOutbox: Send + Sync {
    /// Inserts or overwrites the report with the same id.
    fn enqueue(&self, report: &PendingReport) -> Result<(), OutboxError>;

    /// All stored reports, oldest timestamp first, ties in enqueue order.
    fn list_pending(&self) -> Result<Vec<PendingReport>, OutboxError>;

    fn acknowledge(&self, id: &str) -> Result<(), OutboxError>;

    fn count_pending(&self) -> Result<u64, OutboxError>;
}
