//! In-memory doubles for exercising the daemon without X11 or the network.

mod failing_sink;
mod recording_sink;
mod scripted_source;
mod static_credentials;

pub use failing_sink::FailingSink;
pub use recording_sink::RecordingSink;
pub use scripted_source::ScriptedEventSource;
pub use static_credentials::StaticCredentials;
