// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business-timezone helpers.
//!
//! Every calendar decision (today, weekday, time-of-day match) is taken in the
//! configured business timezone, never in UTC or host-local time.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::FieldopsError;

/// Parse an IANA timezone name such as `America/Sao_Paulo`.
pub fn parse_timezone(name: &str) -> Result<Tz, FieldopsError> {
    name.parse::<Tz>()
        .map_err(|e| FieldopsError::Config(format!("unknown timezone `{name}`: {e}")))
}

/// Convert a UTC instant to business-local time.
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// Business-local calendar date of a UTC instant.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    to_local(instant, tz).date_naive()
}

/// The UTC instant of a local wall-clock time, resolving DST folds to the
/// earlier instant and gaps to the first valid instant after them.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Skip forward through the gap one minute at a time.
            let mut candidate = naive;
            for _ in 0..180 {
                candidate += chrono::Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            Utc.from_utc_datetime(&naive)
        }
    }
}

/// Half-open UTC range `[start, end)` covering one local calendar day.
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(date, NaiveTime::MIN, tz);
    let next = date.succ_opt().unwrap_or(date);
    let end = local_to_utc(next, NaiveTime::MIN, tz);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_rejects_unknown_zone() {
        assert!(parse_timezone("America/Sao_Paulo").is_ok());
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn local_date_differs_from_utc_date_near_midnight() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        // 02:00 UTC is 23:00 of the previous day in Sao Paulo (UTC-3).
        let instant = Utc.with_ymd_and_hms(2026, 6, 10, 2, 0, 0).unwrap();
        assert_eq!(local_date(instant, tz), NaiveDate::from_ymd_opt(2026, 6, 9).unwrap());
    }

    #[test]
    fn day_bounds_span_24_hours() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        let (start, end) = local_day_bounds(date, tz);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 6, 10, 3, 0, 0).unwrap());
        assert_eq!((end - start).num_hours(), 24);
    }
}
