use thiserror::Error;

use crate::domain::{ForegroundApp, TransitionEvent};

#[derive(Error, Debug, Clone)]
pub enum EventSourceError {
    #[error("event source unavailable: {message}")]
    Unavailable { message: String },

    #[error("event query failed: {message}")]
    Query { message: String },
}

/// Platform feed of foreground/background transitions.
pub trait EventSource: Send {
    /// Events with `since_ms < timestamp_ms <= now_ms`, oldest first.
    fn poll_transitions(
        &mut self,
        since_ms: i64,
        now_ms: i64,
    ) -> Result<Vec<TransitionEvent>, EventSourceError>;

    fn most_recent_foreground(
        &mut self,
        window_ms: i64,
    ) -> Result<Option<ForegroundApp>, EventSourceError>;
}
