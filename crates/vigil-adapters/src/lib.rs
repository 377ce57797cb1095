//! Vigil adapters - Infrastructure implementations
//!
//! Concrete implementations of the ports defined in vigil-core: SQLite-backed outbox and
//! heartbeat stores, the Telegram notification sink and the desktop-entry package catalog.

pub mod desktop;
pub mod sqlite;
pub mod telegram;
pub mod testing;

pub use desktop::DesktopEntryCatalog;
pub use sqlite::{SqliteHeartbeatStore, SqliteReportOutbox};
pub use telegram::TelegramSink;
pub use testing::{FailingSink, RecordingSink, ScriptedEventSource, StaticCredentials};
