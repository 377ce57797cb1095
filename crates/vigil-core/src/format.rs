//! Human-readable timestamps and durations used in report messages.

use std::fmt::Display;

use chrono::{Local, TimeZone, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %I:%M %p";

/// Formats epoch milliseconds as `YYYY-MM-DD hh:mm AM/PM` in local time.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    format_timestamp_in(timestamp_ms, &Local)
}

pub fn format_timestamp_in<Tz>(timestamp_ms: i64, timezone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(instant) => instant
            .with_timezone(timezone)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// `{h}h {m}m` from one hour, `{m}m {s}s` from one minute, `{s}s` below.
pub fn format_duration(duration_ms: i64) -> String {
    let total_seconds = duration_ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
