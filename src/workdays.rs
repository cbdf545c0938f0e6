// Working-day deadline arithmetic. Everything here is pure: "today" is
// always an argument, never read from the clock.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::ValidationError;

/// Which two days of the week are the weekend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkWeek {
    /// Saturday and Sunday off
    MondayToFriday,
    /// Friday and Saturday off (Israeli work week)
    SundayToThursday,
}

/// Weekend definition plus dates excluded like weekends (public holidays)
#[derive(Debug, Clone)]
pub struct WorkCalendar {
    pub week: WorkWeek,
    pub holidays: BTreeSet<NaiveDate>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            week: WorkWeek::MondayToFriday,
            holidays: BTreeSet::new(),
        }
    }
}

impl WorkCalendar {
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        match self.week {
            WorkWeek::MondayToFriday => {
                matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            }
            WorkWeek::SundayToThursday => {
                matches!(date.weekday(), Weekday::Fri | Weekday::Sat)
            }
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.is_weekend(date) && !self.holidays.contains(&date)
    }

    /// The calendar date on which working day `n` past `start` falls.
    /// `n = 0` returns the start date itself.
    pub fn target_date(&self, start: NaiveDate, n: i64) -> NaiveDate {
        let mut current = start;
        let mut counted = 0;
        while counted < n {
            current = current + Days::new(1);
            if self.is_working_day(current) {
                counted += 1;
            }
        }
        current
    }
}

/// Result of comparing an elapsed working-day count against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCounter {
    /// Working days elapsed, counted inclusively: day 1 is the start day
    pub current_working_day: i64,
    /// target - current, signed; negative means the deadline has passed
    pub days_remaining: i64,
    pub is_overdue: bool,
}

/// Count working days from `started_on` through `completed_on` (or `as_of`
/// when still open) against a target, inclusive on both ends.
///
/// A start date in the future yields `current_working_day == 0` and is never
/// overdue. A non-positive target is rejected.
pub fn calculate_day_counter(
    started_on: NaiveDate,
    completed_on: Option<NaiveDate>,
    target_working_days: i64,
    as_of: NaiveDate,
    calendar: &WorkCalendar,
) -> Result<DayCounter, ValidationError> {
    if target_working_days <= 0 {
        return Err(ValidationError::InvalidTimerDays(target_working_days));
    }

    let end = completed_on.unwrap_or(as_of);

    let mut current_working_day = 0;
    let mut date = started_on;
    while date <= end {
        if calendar.is_working_day(date) {
            current_working_day += 1;
        }
        date = date + Days::new(1);
    }

    let days_remaining = target_working_days - current_working_day;
    Ok(DayCounter {
        current_working_day,
        days_remaining,
        is_overdue: days_remaining < 0,
    })
}
