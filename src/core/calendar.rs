//! Date and time arithmetic shared by the work-entry and vacation stores

use crate::core::error::{ClientError, ClientResult};
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Timelike, Weekday};
use thiserror::Error;

/// Reasons a vacation date range is refused before submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("Start date cannot be in the past")]
    StartInPast,

    #[error("End date cannot be before start date")]
    EndBeforeStart,

    #[error("Start and end date cannot be the same")]
    SameDay,
}

/// Minutes since midnight for an `HH:MM` string
pub fn minutes_since_midnight(time: &str) -> ClientResult<u32> {
    let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| ClientError::InvalidInput(format!("time '{time}' is not HH:MM")))?;
    Ok(parsed.hour() * 60 + parsed.minute())
}

/// Worked minutes between two `HH:MM` times minus the break, never negative
pub fn calculate_duration(start: &str, end: &str, break_minutes: u32) -> ClientResult<u32> {
    let start = i64::from(minutes_since_midnight(start)?);
    let end = i64::from(minutes_since_midnight(end)?);
    let worked = end - start - i64::from(break_minutes);

    Ok(u32::try_from(worked.max(0)).unwrap_or(0))
}

/// Render minutes as `"{hours}h {minutes}m"`
pub fn format_duration(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Count Monday-to-Friday days in the inclusive range `start..=end`
pub fn working_days(start: NaiveDate, end: NaiveDate) -> u32 {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32
}

/// Monday and Sunday of the ISO week containing `day`
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = u64::from(day.weekday().num_days_from_monday());
    let monday = day - Days::new(offset);
    (monday, monday + Days::new(6))
}

/// First and last day of the month containing `day`
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let next_month = first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(first);
    let last = next_month.pred_opt().unwrap_or(first);
    (first, last)
}

/// Check a requested vacation range against `today`
pub fn validate_vacation_dates(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<(), DateRangeError> {
    if start < today {
        return Err(DateRangeError::StartInPast);
    }
    if end < start {
        return Err(DateRangeError::EndBeforeStart);
    }
    if start == end {
        return Err(DateRangeError::SameDay);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_working_days_full_week() {
        assert_eq!(working_days(date(2024, 1, 1), date(2024, 1, 7)), 5);
    }

    #[test]
    fn test_working_days_edges() {
        // Saturday alone
        assert_eq!(working_days(date(2024, 1, 6), date(2024, 1, 6)), 0);
        // Single weekday
        assert_eq!(working_days(date(2024, 1, 3), date(2024, 1, 3)), 1);
        // Reversed range
        assert_eq!(working_days(date(2024, 1, 7), date(2024, 1, 1)), 0);
        // Two full weeks spanning a month boundary
        assert_eq!(working_days(date(2024, 1, 29), date(2024, 2, 11)), 10);
    }

    #[test]
    fn test_calculate_duration() {
        assert_eq!(calculate_duration("09:00", "17:30", 30).unwrap(), 480);
        assert_eq!(calculate_duration("09:00", "09:15", 30).unwrap(), 0);
        assert_eq!(calculate_duration("17:00", "09:00", 0).unwrap(), 0);
        assert_eq!(calculate_duration("8:05", "12:00", 0).unwrap(), 235);
    }

    #[test]
    fn test_calculate_duration_rejects_bad_time() {
        let err = calculate_duration("9am", "17:00", 0).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(450), "7h 30m");
        assert_eq!(format_duration(0), "0h 0m");
        assert_eq!(format_duration(59), "0h 59m");
    }

    #[test]
    fn test_week_bounds() {
        // Wednesday
        assert_eq!(week_bounds(date(2024, 1, 3)), (date(2024, 1, 1), date(2024, 1, 7)));
        // Sunday belongs to the week that started on Monday
        assert_eq!(week_bounds(date(2024, 1, 7)), (date(2024, 1, 1), date(2024, 1, 7)));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(date(2024, 2, 14)), (date(2024, 2, 1), date(2024, 2, 29)));
        assert_eq!(month_bounds(date(2023, 12, 31)), (date(2023, 12, 1), date(2023, 12, 31)));
    }

    #[test]
    fn test_validate_vacation_dates() {
        let today = date(2024, 6, 10);

        assert_eq!(
            validate_vacation_dates(date(2024, 6, 9), date(2024, 6, 12), today),
            Err(DateRangeError::StartInPast)
        );
        assert_eq!(
            validate_vacation_dates(date(2024, 6, 14), date(2024, 6, 12), today),
            Err(DateRangeError::EndBeforeStart)
        );
        assert_eq!(
            validate_vacation_dates(date(2024, 6, 12), date(2024, 6, 12), today),
            Err(DateRangeError::SameDay)
        );
        assert!(validate_vacation_dates(today, date(2024, 6, 12), today).is_ok());
        assert_eq!(
            DateRangeError::StartInPast.to_string(),
            "Start date cannot be in the past"
        );
    }
}
