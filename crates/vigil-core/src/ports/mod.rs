mod clock;
mod event_source;
mod heartbeat_store;
mod notification_sink;
mod package_catalog;
mod package_classifier;
mod report_outbox;

pub use clock::{Clock, SystemClock};
pub use event_source::{EventSource, EventSourceError};
pub use heartbeat_store::{HeartbeatStore, HeartbeatStoreError};
pub use notification_sink::{CredentialSource, DeliveryCredentials, DeliveryError, NotificationSink};
pub use package_catalog::{CatalogError, PackageCatalog};
pub use package_classifier::PackageClassifier;
pub use report_outbox::{OutboxError, ReportOutbox};
