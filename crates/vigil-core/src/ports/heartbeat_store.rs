use thiserror::Error;

use crate::domain::HeartbeatMark;

#[derive(Error, Debug)]
pub enum HeartbeatStoreError {
    #[error("heartbeat storage error: {message}")]
    Storage { message: String },
}

pub trait HeartbeatStore: Send + Sync {
    fn record(&self, mark: HeartbeatMark) -> Result<(), HeartbeatStoreError>;

    fn last(&self) -> Result<Option<HeartbeatMark>, HeartbeatStoreError>;
}
