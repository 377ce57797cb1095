mod heartbeat_store;
mod report_outbox;

pub use heartbeat_store::SqliteHeartbeatStore;
pub use report_outbox::SqliteReportOutbox;
