//! Time related utils.

/// UTC datetime used across the signing process.
pub type DateTime = chrono::DateTime<chrono::Utc>;

/// Take the current time in UTC.
///
/// The timestamp is captured once per signing call, immediately before the
/// canonical request is built.
pub fn now() -> DateTime {
    chrono::Utc::now()
}

/// Format a datetime into ISO-8601 basic format: `20220301T120000Z`.
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a datetime into the date stamp used by the credential scope:
/// `20220301`.
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_iso8601() {
        let t = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        assert_eq!(format_iso8601(t), "20220301T081234Z");
    }

    #[test]
    fn test_format_date() {
        let t = chrono::Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        assert_eq!(format_date(t), "20220301");
    }

    #[test]
    fn test_date_is_prefix_of_iso8601() {
        let t = now();
        assert!(format_iso8601(t).starts_with(&format_date(t)));
    }
}
