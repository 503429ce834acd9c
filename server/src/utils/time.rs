//! Time utility functions

use chrono::{DateTime, Utc};

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to DateTime<Utc>
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(|| {
        tracing::warn!(millis, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// Parse ISO 8601 / RFC 3339 timestamp string to epoch milliseconds
pub fn parse_iso_millis(ts: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .ok()
}

/// Format epoch milliseconds as an RFC 3339 string
pub fn millis_to_rfc3339(millis: i64) -> String {
    millis_to_datetime(millis).to_rfc3339()
}
