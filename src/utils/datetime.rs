//! Parsing for the `date` / `time` pairs clients send for departures.
//!
//! Dates are `YYYY-MM-DD`, times are `HH:MM`, both read as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{AppError, AppResult};

pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format. Use YYYY-MM-DD.".to_string()))
}

pub fn parse_departure(date: &str, time: &str) -> AppResult<DateTime<Utc>> {
    let day = parse_date(date)
        .map_err(|_| AppError::Validation("Invalid date/time format".to_string()))?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| AppError::Validation("Invalid date/time format".to_string()))?;
    Ok(NaiveDateTime::new(day, time).and_utc())
}

/// Like [`parse_departure`] but rejects instants that are not strictly after `now`.
pub fn parse_future_departure(
    date: &str,
    time: &str,
    now: DateTime<Utc>,
) -> AppResult<DateTime<Utc>> {
    let departure = parse_departure(date, time)?;
    if departure <= now {
        return Err(AppError::Validation(
            "You cannot offer a ride in the past".to_string(),
        ));
    }
    Ok(departure)
}

/// Half-open `[start, end)` UTC bounds of a calendar day.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}
