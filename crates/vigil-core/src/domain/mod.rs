mod heartbeat_mark;
mod interruption;
mod report;
mod session;
mod transition;

pub use heartbeat_mark::HeartbeatMark;
pub use interruption::Interruption;
pub use report::{PendingReport, ReportKind, ReportPayload};
pub use session::Session;
pub use transition::{ForegroundApp, TransitionEvent, TransitionKind};
