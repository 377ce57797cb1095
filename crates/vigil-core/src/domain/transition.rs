use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    ToForeground,
    ToBackground,
}

/// A raw foreground/background change reported by an event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub package: String,
    pub timestamp_ms: i64,
    pub kind: TransitionKind,
}

impl TransitionEvent {
    pub fn to_foreground(package: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            package: package.into(),
            timestamp_ms,
            kind: TransitionKind::ToForeground,
        }
    }

    pub fn to_background(package: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            package: package.into(),
            timestamp_ms,
            kind: TransitionKind::ToBackground,
        }
    }
}

/// Answer to "which application was used most recently".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundApp {
    pub package: String,
    pub last_used_ms: i64,
}

impl ForegroundApp {
    pub fn new(package: impl Into<String>, last_used_ms: i64) -> Self {
        Self {
            package: package.into(),
            last_used_ms,
        }
    }
}
