//! Calendar-day utilities
//!
//! Every component keys and windows by the **UTC calendar day**, regardless
//! of log kind. The persisted ledger stores the day as a BSON DateTime at
//! UTC midnight.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Truncate an instant to its UTC calendar day.
pub fn utc_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// The current UTC calendar day.
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Midnight (start of day) of a calendar day, as a UTC instant.
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

/// Convert a calendar day to its persisted form: BSON DateTime at UTC midnight.
pub fn day_to_bson(day: NaiveDate) -> bson::DateTime {
    bson::DateTime::from_chrono(day_start(day))
}

/// Calendar day of a persisted BSON instant.
pub fn bson_day(dt: bson::DateTime) -> NaiveDate {
    utc_day(dt.to_chrono())
}

/// First day of the trailing window of `days` calendar days ending at
/// `today` inclusive. A 7-day window ending on the 10th starts on the 4th.
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(i64::from(days.saturating_sub(1)))
}

/// The trailing window of `days` calendar days ending at `today`, oldest first.
pub fn trailing_days(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .map(|back| today - Duration::days(i64::from(back)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn truncates_to_utc_day() {
        let late = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 1).unwrap();
        assert_eq!(utc_day(late), utc_day(early));
        assert_eq!(utc_day(late), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    }

    #[test]
    fn window_start_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(
            window_start(today, 7),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
        assert_eq!(window_start(today, 1), today);
    }

    #[test]
    fn trailing_days_covers_window_oldest_first() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let days = trailing_days(today, 3);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
                today,
            ]
        );
    }

    #[test]
    fn bson_day_round_trip() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(bson_day(day_to_bson(day)), day);
    }
}
