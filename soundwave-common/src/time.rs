//! Timestamp storage helpers
//!
//! Timestamps are stored as RFC 3339 strings in UTC so that rows sort
//! lexicographically in creation order and round-trip without timezone
//! ambiguity.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Current UTC time
pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for database storage (RFC 3339, millisecond precision)
pub fn storage_format(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC 3339 timestamp back into UTC
pub fn parse_storage(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_round_trip() {
        let now = utc_now();
        let stored = storage_format(now);
        let parsed = parse_storage(&stored).unwrap();

        // Millisecond precision survives the round trip
        assert_eq!(parsed.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_stored_timestamps_sort_chronologically() {
        let earlier = utc_now();
        let later = earlier + chrono::Duration::seconds(1);

        assert!(storage_format(earlier) < storage_format(later));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_storage("not-a-timestamp").is_err());
    }
}
