//! Timestamp parsing and normalization to Vietnam local time.
//!
//! All instants entering the system pass through [`parse_instant`] and come
//! out carrying the canonical UTC+7 offset. Asia/Ho_Chi_Minh observes no DST,
//! so a fixed offset is exact.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::weather::error::TimestampError;

/// Seconds east of UTC for Asia/Ho_Chi_Minh.
pub const VIETNAM_OFFSET_SECONDS: i32 = 7 * 3600;

/// Canonical display offset (UTC+7).
pub fn vietnam_offset() -> FixedOffset {
    FixedOffset::east_opt(VIETNAM_OFFSET_SECONDS).expect("UTC+7 is a valid offset")
}

/// Re-express an instant in UTC+7. The instant itself is unchanged.
pub fn to_local<Tz: chrono::TimeZone>(instant: &DateTime<Tz>) -> DateTime<FixedOffset> {
    instant.with_timezone(&vietnam_offset())
}

/// Parse an offset-aware timestamp and normalize it to UTC+7.
///
/// Accepts RFC 3339 and the SQL-style space separator. Text that parses as a
/// naive date-time is rejected with [`TimestampError::MissingOffset`].
pub fn parse_instant(value: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(to_local(&parsed));
    }

    for format in [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
        "%Y-%m-%dT%H:%M:%S%.f%#z",
    ] {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Ok(to_local(&parsed));
        }
    }

    // A space-separated UTC marker ("2024-01-01 02:00:00Z") is common in SQL output.
    if let Some(stripped) = trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix(" UTC")) {
        if let Some(naive) = parse_naive(stripped.trim_end()) {
            return Ok(to_local(&naive.and_utc()));
        }
    }

    if parse_naive(trimmed).is_some() {
        return Err(TimestampError::MissingOffset {
            value: trimmed.to_string(),
        });
    }

    Err(TimestampError::Malformed {
        value: trimmed.to_string(),
    })
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Parse a DATE cell, or an instant, into its UTC+7 calendar date.
pub fn parse_local_date(value: &str) -> Result<NaiveDate, TimestampError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_instant(trimmed).map(|instant| instant.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_and_plus_seven_denote_the_same_instant() {
        let utc = parse_instant("2024-01-01T02:00:00Z").unwrap();
        let local = parse_instant("2024-01-01T09:00:00+07:00").unwrap();

        assert_eq!(utc, local);
        assert_eq!(utc.to_rfc3339(), "2024-01-01T09:00:00+07:00");
    }

    #[test]
    fn fractional_seconds_and_space_separator_are_accepted() {
        let a = parse_instant("2024-03-05T10:00:00.000Z").unwrap();
        let b = parse_instant("2024-03-05 17:00:00+07:00").unwrap();
        let c = parse_instant("2024-03-05 10:00:00Z").unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn output_always_carries_the_vietnam_offset() {
        let parsed = parse_instant("2024-06-01T00:00:00-05:00").unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), VIETNAM_OFFSET_SECONDS);
        assert_eq!(parsed.to_rfc3339(), "2024-06-01T12:00:00+07:00");
    }

    #[test]
    fn naive_timestamp_is_rejected_as_missing_offset() {
        let err = parse_instant("2024-01-01 09:00:00").unwrap_err();
        assert!(matches!(err, TimestampError::MissingOffset { .. }));
    }

    #[test]
    fn garbage_is_rejected_as_malformed() {
        let err = parse_instant("yesterday-ish").unwrap_err();
        assert!(matches!(err, TimestampError::Malformed { .. }));
    }

    #[test]
    fn local_date_uses_vietnam_calendar_day() {
        // 18:00 UTC is already the next day in Vietnam.
        assert_eq!(
            parse_local_date("2024-01-01T18:00:00Z").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(
            parse_local_date("2024-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }
}
