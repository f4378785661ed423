mod note;

pub use note::{Note, NoteDraft, NotePatch, PREVIEW_CHARS, UNTITLED};

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp the way rows are stored: ISO-8601 UTC, millisecond
/// precision, `Z` suffix (`2025-01-31T09:15:02.120Z`).
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp. Accepts any RFC 3339 offset.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Current time truncated to the precision rows are stored with, so an
/// in-memory value compares equal to what a later read returns.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    parse_timestamp(&format_timestamp(&now)).unwrap_or(now)
}
