//! Timestamp formatting.
//!
//! Logged and returned timestamps are UTC RFC 3339 with microsecond precision
//! and a `Z` suffix. The fixed width keeps lexical order equal to time order,
//! which the request log relies on for its time-window queries.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format `at` as a fixed-width UTC timestamp.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time, formatted with [`format_timestamp`].
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_width_with_z_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap();
        assert_eq!(format_timestamp(at), "2024-03-01T12:00:05.000000Z");
    }

    #[test]
    fn lexical_order_matches_time_order() {
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 9, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert!(format_timestamp(a) < format_timestamp(b));
    }
}
