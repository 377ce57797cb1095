//! Vigil core library
//!
//! Contains the domain types, the port definitions (traits) and the pure services of the
//! monitoring daemon: session tracking, interruption detection, package classification and
//! ordered delivery of pending reports. This crate has no knowledge of infrastructure concerns.

pub mod classifier;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod format;
pub mod heartbeat;
pub mod ports;
pub mod secrets;
pub mod tracker;

pub use classifier::CachedPackageClassifier;
pub use config::{
    AlarmConfig, ClassifierConfig, Config, ConfigError, DeliveryConfig, HeartbeatConfig,
    StorageConfig, TrackingConfig,
};
pub use delivery::{DeliveryPipeline, FlushOutcome};
pub use domain::{
    ForegroundApp, HeartbeatMark, Interruption, PendingReport, ReportKind, ReportPayload,
    Session, TransitionEvent, TransitionKind,
};
pub use heartbeat::{DetectorError, InterruptionDetector};
pub use ports::{
    CatalogError, Clock, CredentialSource, DeliveryCredentials, DeliveryError, EventSource,
    EventSourceError, HeartbeatStore, HeartbeatStoreError, NotificationSink, OutboxError,
    PackageCatalog, PackageClassifier, ReportOutbox, SystemClock,
};
pub use secrets::{
    resolve_telegram_credentials, save_telegram_credentials, secrets_path, SecretsCredentialSource,
    SecretsError,
};
pub use tracker::SessionTracker;
