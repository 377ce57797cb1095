mod delivery;
mod notifier;
mod tracker;

pub use delivery::DeliveryHandle;
pub use notifier::{NotifierActor, NotifierHandle};
pub use tracker::{
    TrackerActor, TrackerDependencies, TrackerHandle, TrackerSettings, TrackerStatus,
};
