//! Formatting helpers shared by the renderer and the index.

use chrono::{DateTime, Local, NaiveDateTime};

/// Precision used when displaying a raw log timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePrecision {
    /// `YYYY-MM-DD HH:MM:SS`
    Seconds,
    /// `YYYY-MM-DD HH:MM`
    Minutes,
}

impl TimePrecision {
    fn pattern(self) -> &'static str {
        match self {
            TimePrecision::Seconds => "%Y-%m-%d %H:%M:%S",
            TimePrecision::Minutes => "%Y-%m-%d %H:%M",
        }
    }

    fn fallback_len(self) -> usize {
        match self {
            TimePrecision::Seconds => 19,
            TimePrecision::Minutes => 16,
        }
    }
}

/// Format a raw ISO-8601 timestamp for display.
///
/// The timestamp keeps its own offset (no conversion to local time).
/// Values that do not parse are truncated to the width of the pattern.
pub fn format_timestamp(raw: &str, precision: TimePrecision) -> String {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(precision.pattern()).to_string();
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format(precision.pattern()).to_string();
    }

    truncate_chars(raw, precision.fallback_len())
}

/// Format an optional raw timestamp, or `None` when absent or blank.
pub fn format_timestamp_opt(raw: Option<&str>, precision: TimePrecision) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| format_timestamp(s, precision))
}

/// Current local time at the given precision.
pub fn now(precision: TimePrecision) -> String {
    Local::now().format(precision.pattern()).to_string()
}

/// Take at most `max` characters from `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Short form of a session id used in file names and headings.
pub fn short_id(id: &str) -> String {
    truncate_chars(id, 8)
}
