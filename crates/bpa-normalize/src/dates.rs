//! Date handling between wire strings and form dates
//!
//! Wire dates arrive as plain dates, naive timestamps or RFC 3339 instants.
//! Instants are shifted into the configured offset before the calendar date is
//! taken. Outgoing dates are the UTC instant of local midnight.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a wire date string
///
/// Returns `None` for blank or unrecognized input.
#[must_use]
pub fn parse_wire_date(raw: &str, offset: FixedOffset) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&offset).date_naive());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

/// Serialize a form date as the UTC timestamp of midnight at `offset`
#[must_use]
pub fn to_wire_timestamp(date: NaiveDate, offset: FixedOffset) -> String {
    let local_midnight = date.and_time(NaiveTime::default());
    let utc = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    utc.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Fixed offset from whole minutes east of UTC
#[must_use]
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        offset_from_minutes(0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_and_naive_dates() {
        assert_eq!(parse_wire_date("2024-03-15", utc()), Some(date(2024, 3, 15)));
        assert_eq!(
            parse_wire_date("2024-03-15T10:20:30", utc()),
            Some(date(2024, 3, 15))
        );
        assert_eq!(
            parse_wire_date("2024-03-15 10:20:30.123", utc()),
            Some(date(2024, 3, 15))
        );
    }

    #[test]
    fn rfc3339_instants_shift_into_offset() {
        let dubai = offset_from_minutes(240).unwrap();
        assert_eq!(
            parse_wire_date("2024-03-14T20:00:00.000Z", dubai),
            Some(date(2024, 3, 15))
        );
        assert_eq!(
            parse_wire_date("2024-03-14T20:00:00.000Z", utc()),
            Some(date(2024, 3, 14))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_wire_date("", utc()), None);
        assert_eq!(parse_wire_date("15/03/2024", utc()), None);
        assert_eq!(parse_wire_date("undefined", utc()), None);
    }

    #[test]
    fn midnight_timestamps() {
        assert_eq!(
            to_wire_timestamp(date(2024, 3, 15), utc()),
            "2024-03-15T00:00:00.000Z"
        );
        let dubai = offset_from_minutes(240).unwrap();
        assert_eq!(
            to_wire_timestamp(date(2024, 3, 15), dubai),
            "2024-03-14T20:00:00.000Z"
        );
    }

    #[test]
    fn timestamps_parse_back_to_same_date() {
        for minutes in [-600, -300, 0, 180, 240, 330, 600] {
            let offset = offset_from_minutes(minutes).unwrap();
            let d = date(2025, 1, 1);
            assert_eq!(parse_wire_date(&to_wire_timestamp(d, offset), offset), Some(d));
        }
    }

    #[test]
    fn offset_bounds() {
        assert!(offset_from_minutes(14 * 60).is_some());
        assert!(offset_from_minutes(25 * 60).is_none());
    }
}
