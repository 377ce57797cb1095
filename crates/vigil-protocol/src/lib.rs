//! Vigil protocol definitions for CLI-daemon communication
//!
//! Every message travels as a little-endian `u32` length followed by the bincode payload.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use vigil_core::{FlushOutcome, Interruption};

/// Requests sent from CLI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Ping,
    /// Begin tracking (no-op when already running)
    Start,
    /// Stop tracking, closing the open session first
    Stop,
    GetStatus,
    /// Attempt one delivery pass over the outbox
    FlushNow,
    /// Compare the last heartbeat with now and record any monitoring gap
    CheckInterruption,
}

/// Responses sent from daemon to CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Pong,
    Ok,
    Status {
        running: bool,
        active_package: Option<String>,
        active_since_ms: Option<i64>,
        pending_reports: u64,
    },
    Flushed {
        outcome: FlushOutcome,
    },
    InterruptionChecked {
        interruption: Option<Interruption>,
    },
    Error {
        message: String,
    },
}

/// Local socket shared by the daemon and the CLI.
#[cfg(unix)]
pub fn socket_path() -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/run/user/{}/vigil.sock", uid))
}

#[cfg(not(unix))]
pub fn socket_path() -> PathBuf {
    std::env::temp_dir().join("vigil.sock")
}

/// Prefixes a serialized message with its length.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, bincode::Error> {
    let payload = bincode::serialize(message)?;
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
