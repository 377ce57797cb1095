use std::fmt::Display;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::format::{format_duration, format_timestamp_in};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    SessionEnter,
    SessionClosed,
    Interruption,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::SessionEnter => "enter",
            ReportKind::SessionClosed => "session",
            ReportKind::Interruption => "interruption",
        }
    }

    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "enter" => Some(ReportKind::SessionEnter),
            "session" => Some(ReportKind::SessionClosed),
            "interruption" => Some(ReportKind::Interruption),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportPayload {
    SessionEnter {
        package: String,
        #[serde(default)]
        app_name: String,
        at_ms: i64,
    },
    SessionClosed {
        package: String,
        #[serde(default)]
        app_name: String,
        start_ms: i64,
        end_ms: i64,
        duration_ms: i64,
    },
    Interruption {
        from_ms: i64,
        to_ms: i64,
        duration_ms: i64,
    },
}

/// A report waiting in the outbox until the sink confirms delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReport {
    pub id: String,
    pub kind: ReportKind,
    pub timestamp_ms: i64,
    pub payload: ReportPayload,
}

impl PendingReport {
    pub fn session_enter(package: &str, app_name: &str, at_ms: i64) -> Self {
        Self {
            id: format!("{}_{}_{}", ReportKind::SessionEnter, at_ms, package),
            kind: ReportKind::SessionEnter,
            timestamp_ms: at_ms,
            payload: ReportPayload::SessionEnter {
                package: package.to_string(),
                app_name: app_name.to_string(),
                at_ms,
            },
        }
    }

    pub fn session_closed(package: &str, app_name: &str, start_ms: i64, end_ms: i64) -> Self {
        let end_ms = end_ms.max(start_ms);
        Self {
            id: format!("{}_{}_{}", ReportKind::SessionClosed, end_ms, package),
            kind: ReportKind::SessionClosed,
            timestamp_ms: end_ms,
            payload: ReportPayload::SessionClosed {
                package: package.to_string(),
                app_name: app_name.to_string(),
                start_ms,
                end_ms,
                duration_ms: end_ms - start_ms,
            },
        }
    }

    pub fn interruption(from_ms: i64, to_ms: i64, duration_ms: i64) -> Self {
        Self {
            id: format!("{}_{}", ReportKind::Interruption, from_ms),
            kind: ReportKind::Interruption,
            timestamp_ms: to_ms,
            payload: ReportPayload::Interruption {
                from_ms,
                to_ms,
                duration_ms,
            },
        }
    }

    /// Renders the message sent to the notification sink, in local time.
    pub fn render_message(&self) -> String {
        self.render_message_in(&Local)
    }

    pub fn render_message_in<Tz>(&self, timezone: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        match &self.payload {
            ReportPayload::SessionEnter {
                package,
                app_name,
                at_ms,
            } => format!(
                "App: {}\nAt : {}",
                display_name_or_package(app_name, package),
                format_timestamp_in(*at_ms, timezone)
            ),
            ReportPayload::SessionClosed {
                package,
                app_name,
                start_ms,
                end_ms,
                duration_ms,
            } => format!(
                "📱 App Usage\n\nApp: {}\nPackage: {}\nFrom: {}\nTo: {}\nDuration: {}",
                display_name_or_package(app_name, package),
                package,
                format_timestamp_in(*start_ms, timezone),
                format_timestamp_in(*end_ms, timezone),
                format_duration(*duration_ms)
            ),
            ReportPayload::Interruption {
                from_ms,
                to_ms,
                duration_ms,
            } => format!(
                "⚠️ Monitoring Interruption\n\nFrom: {}\nTo: {}\nDuration: {}",
                format_timestamp_in(*from_ms, timezone),
                format_timestamp_in(*to_ms, timezone),
                format_duration(*duration_ms)
            ),
        }
    }
}

fn display_name_or_package<'a>(app_name: &'a str, package: &'a str) -> &'a str {
    if app_name.is_empty() {
        package
    } else {
        app_name
    }
}
