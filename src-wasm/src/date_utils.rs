//! Calendar labels for day offsets
//!
//! Day offsets stay the engine's unit; these helpers only turn them into
//! "YYYY-MM-DD" labels and working-day counts when a project start is known.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::types::Calendar;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Check if a date is a working day based on the calendar
pub fn is_work_day(date: &NaiveDate, calendar: &Calendar) -> bool {
    let date_str = format_date(*date);

    if let Some(exception) = calendar.exceptions.get(&date_str) {
        // Object exceptions say explicitly, string exceptions are holidays
        if let Some(working) = exception.get("working").and_then(|w| w.as_bool()) {
            return working;
        }
        return false;
    }

    let day_index = match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    };
    calendar.working_days.contains(&day_index)
}

/// Date containing `day` (fractional days fall on the same date)
pub fn day_to_date(project_start: NaiveDate, day: f64) -> Option<NaiveDate> {
    if !day.is_finite() {
        return None;
    }
    project_start.checked_add_signed(Duration::try_days(day.floor() as i64)?)
}

/// Working days from `start` to `end`, both inclusive. 0 for reversed ranges.
pub fn count_work_days(start: NaiveDate, end: NaiveDate, calendar: &Calendar) -> i32 {
    let mut count = 0;
    let mut current = start;
    while current <= end {
        if is_work_day(&current, calendar) {
            count += 1;
        }
        current = match current.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    count
}

/// Start date, finish date and working days for one bar
#[derive(Debug, Clone, PartialEq)]
pub struct DateLabels {
    pub start_date: String,
    pub finish_date: String,
    pub work_days: i32,
}

/// Labels for a bar. The finish date is the last day the bar touches, so a
/// 10-day task starting on day 0 finishes on day 9.
pub fn label_bar(calendar: &Calendar, start_day: f64, duration_days: f64) -> Option<DateLabels> {
    let project_start = parse_date(calendar.project_start.as_deref()?)?;
    let start = day_to_date(project_start, start_day)?;
    let last_day = ((start_day + duration_days).ceil() - 1.0).max(start_day.floor());
    let finish = day_to_date(project_start, last_day)?;
    let work_days = if duration_days > 0.0 {
        count_work_days(start, finish, calendar)
    } else {
        0
    };
    Some(DateLabels {
        start_date: format_date(start),
        finish_date: format_date(finish),
        work_days,
    })
}
