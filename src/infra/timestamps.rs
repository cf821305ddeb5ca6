// Timestamps are stored as RFC 3339 text in SQLite.

use chrono::{DateTime, Utc};

/// Parse a stored timestamp. Unreadable values fall back to now, loudly.
pub fn parse(value: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!(value, error = %e, "Unreadable stored timestamp, using current time");
            Utc::now()
        }
    }
}

pub fn parse_optional(value: Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().map(parse)
}
