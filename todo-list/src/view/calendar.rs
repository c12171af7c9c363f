use crate::task::Task;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// One cell of a month grid whose weeks start on Sunday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCell {
    /// Padding before the first day of the month.
    Blank,
    Day(CalendarDay),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub due_count: usize,
    pub is_today: bool,
}

impl CalendarDay {
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn has_tasks(&self) -> bool {
        self.due_count > 0
    }
}

/// Number of tasks due on each date.
pub fn due_counts(tasks: &[Task]) -> HashMap<NaiveDate, usize> {
    let mut counts = HashMap::new();
    for task in tasks {
        *counts.entry(task.due_date()).or_insert(0) += 1;
    }
    counts
}

/// Month grid for `year`/`month`: one blank per weekday before the 1st,
/// then one cell per day. Returns `None` for an invalid month.
pub fn calendar_grid(
    tasks: &[Task],
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Option<Vec<CalendarCell>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let counts = due_counts(tasks);
    let leading = first.weekday().num_days_from_sunday() as usize;

    let days = first
        .iter_days()
        .take_while(|date| date.month() == month)
        .map(|date| {
            CalendarCell::Day(CalendarDay {
                date,
                due_count: counts.get(&date).copied().unwrap_or(0),
                is_today: date == today,
            })
        });

    Some(
        std::iter::repeat_n(CalendarCell::Blank, leading)
            .chain(days)
            .collect(),
    )
}
