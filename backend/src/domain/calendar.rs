//! Week, month, and frequency-gate date arithmetic.
//!
//! Weeks run Monday through Sunday. All instants are UTC.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::models::ChoreFrequency;

/// Monday of the week containing `date`.
pub fn week_start_date(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sunday of the week containing `date`.
pub fn week_end_date(date: NaiveDate) -> NaiveDate {
    week_start_date(date) + Duration::days(6)
}

/// Parses a "YYYY-MM" key into the first and last day of that month.
pub fn month_bounds(month_year: &str) -> Result<(NaiveDate, NaiveDate)> {
    let (year_str, month_str) = month_year
        .split_once('-')
        .with_context(|| format!("invalid month key: {}", month_year))?;
    let year: i32 = year_str
        .parse()
        .with_context(|| format!("invalid month key: {}", month_year))?;
    let month: u32 = month_str
        .parse()
        .with_context(|| format!("invalid month key: {}", month_year))?;
    if month_str.len() != 2 || !(1..=12).contains(&month) {
        bail!("invalid month key: {}", month_year);
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid month key: {}", month_year))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .with_context(|| format!("invalid month key: {}", month_year))?;
    Ok((first, next_first - Duration::days(1)))
}

/// When a chore completed at `now` becomes available again.
///
/// Daily chores cool down a full 24 hours; weekly chores unlock on the next
/// Monday (always at least one day out); monthly chores unlock on the first
/// of the next month at the same time of day.
pub fn next_available(frequency: ChoreFrequency, now: DateTime<Utc>) -> DateTime<Utc> {
    match frequency {
        ChoreFrequency::Daily => now + Duration::hours(24),
        ChoreFrequency::Weekly => {
            let today = now.date_naive();
            let mut days_ahead = (7 - today.weekday().num_days_from_monday()) % 7;
            if days_ahead == 0 {
                days_ahead = 7;
            }
            now + Duration::days(days_ahead as i64)
        }
        ChoreFrequency::Monthly => {
            let today = now.date_naive();
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            // from_ymd_opt(_, _, 1) cannot fail for a valid year
            let first = NaiveDate::from_ymd_opt(year, month, 1)
                .unwrap_or(today)
                .and_time(now.time());
            DateTime::<Utc>::from_naive_utc_and_offset(first, Utc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_week_bounds() {
        // 2025-03-12 is a Wednesday
        let wed = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(week_start_date(wed), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(week_end_date(wed), NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());

        // A Monday is its own week start
        let mon = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(week_start_date(mon), mon);

        // A Sunday belongs to the preceding Monday's week
        let sun = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        assert_eq!(week_start_date(sun), mon);
    }

    #[test]
    fn test_month_bounds() {
        let (first, last) = month_bounds("2025-02").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());

        let (first, last) = month_bounds("2024-12").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        assert!(month_bounds("2025-13").is_err());
        assert!(month_bounds("2025-2").is_err());
        assert!(month_bounds("garbage").is_err());
        assert!(month_bounds("2025/02").is_err());
    }

    #[test]
    fn test_daily_gate_is_24_hours() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).unwrap();
        assert_eq!(
            next_available(ChoreFrequency::Daily, now),
            Utc.with_ymd_and_hms(2025, 3, 11, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_gate_lands_on_next_monday() {
        // Wednesday -> following Monday
        let wed = Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap();
        assert_eq!(
            next_available(ChoreFrequency::Weekly, wed),
            Utc.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap()
        );

        // Completing on a Monday gates until the Monday after, never today
        let mon = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(
            next_available(ChoreFrequency::Weekly, mon),
            Utc.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap()
        );

        // Sunday -> tomorrow
        let sun = Utc.with_ymd_and_hms(2025, 3, 16, 9, 0, 0).unwrap();
        assert_eq!(
            next_available(ChoreFrequency::Weekly, sun),
            Utc.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_gate_first_of_next_month() {
        let mid_march = Utc.with_ymd_and_hms(2025, 3, 15, 16, 45, 0).unwrap();
        assert_eq!(
            next_available(ChoreFrequency::Monthly, mid_march),
            Utc.with_ymd_and_hms(2025, 4, 1, 16, 45, 0).unwrap()
        );

        // December rolls into January of the next year
        let december = Utc.with_ymd_and_hms(2025, 12, 31, 8, 0, 0).unwrap();
        assert_eq!(
            next_available(ChoreFrequency::Monthly, december),
            Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap()
        );
    }
}
