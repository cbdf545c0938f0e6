// Presentation of a running deadline timer. A stage or task stores a
// display style (1-5); clicking the badge cycles it. Rendering here is
// plain text so the CLI and any richer frontend share one source of truth.

use chrono::NaiveDate;

use crate::workdays::{DayCounter, WorkCalendar};

/// The five badge presentation variants. Stored as 1-5 in the database;
/// anything out of range reads as DayOfTarget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeStyle {
    /// "day 3/10"
    DayOfTarget,
    /// "7 left" or "overdue by 2"
    Remaining,
    /// "3 working days"
    Elapsed,
    /// "30%"
    Percent,
    /// "due 2026-03-13"
    TargetDate,
}

impl BadgeStyle {
    pub fn from_index(index: i64) -> Self {
        match index {
            2 => BadgeStyle::Remaining,
            3 => BadgeStyle::Elapsed,
            4 => BadgeStyle::Percent,
            5 => BadgeStyle::TargetDate,
            _ => BadgeStyle::DayOfTarget,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            BadgeStyle::DayOfTarget => 1,
            BadgeStyle::Remaining => 2,
            BadgeStyle::Elapsed => 3,
            BadgeStyle::Percent => 4,
            BadgeStyle::TargetDate => 5,
        }
    }
}

/// Next style index, wrapping 5 back to 1
pub fn cycle_style(index: i64) -> i64 {
    if index >= 5 {
        1
    } else {
        index + 1
    }
}

/// Render a timer badge for the given counter and style.
/// Overdue timers get a leading warning marker in every style.
pub fn render(
    style: BadgeStyle,
    counter: &DayCounter,
    target_working_days: i64,
    started_on: NaiveDate,
    calendar: &WorkCalendar,
) -> String {
    let marker = if counter.is_overdue { "! " } else { "" };
    match style {
        BadgeStyle::DayOfTarget => format!(
            "{}day {}/{}",
            marker, counter.current_working_day, target_working_days
        ),
        BadgeStyle::Remaining => {
            if counter.is_overdue {
                format!("{}overdue by {}", marker, -counter.days_remaining)
            } else {
                format!("{} left", counter.days_remaining)
            }
        }
        BadgeStyle::Elapsed => format!("{}{} working days", marker, counter.current_working_day),
        BadgeStyle::Percent => {
            let pct =
                (counter.current_working_day as f64 / target_working_days as f64 * 100.0).round();
            format!("{}{}%", marker, pct as i64)
        }
        BadgeStyle::TargetDate => {
            // Target counts the start day itself as day 1
            let due = calendar.target_date(started_on, target_working_days - 1);
            format!("{}due {}", marker, due.format("%Y-%m-%d"))
        }
    }
}
