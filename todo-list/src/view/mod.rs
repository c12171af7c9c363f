//! Derived views over a task collection.
//!
//! Everything here is a pure function of its inputs. Dates such as "today"
//! are passed in by the caller so results never depend on the wall clock.

pub mod calendar;
pub mod stats;

pub use calendar::{CalendarCell, CalendarDay, calendar_grid, due_counts};
pub use stats::{completed_today, longest_streak, progress_percent, streak};

use crate::task::{Priority, Task};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Transient filter/search state. Never persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterState {
    category: Option<String>,
    priority: Option<Priority>,
    search: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact category to keep. A blank value clears the filter.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        self.category = Some(category.trim().to_string()).filter(|c| !c.is_empty());
        self
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    /// Case-insensitive substring to look for in task names.
    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.trim().to_lowercase();
        self
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn matches(&self, task: &Task) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|category| task.category() == Some(category));
        let priority_ok = self
            .priority
            .is_none_or(|priority| task.priority() == priority);
        let search_ok =
            self.search.is_empty() || task.name().to_lowercase().contains(&self.search);
        category_ok && priority_ok && search_ok
    }
}

pub fn filter<'a>(tasks: &'a [Task], filter: &FilterState) -> Vec<&'a Task> {
    tasks.iter().filter(|task| filter.matches(task)).collect()
}

/// Orders incomplete before completed, then by priority rank, then by due
/// date. Equal keys keep their input order.
pub fn sort<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<&'a Task> {
    let mut sorted: Vec<&Task> = tasks.into_iter().collect();
    sorted.sort_by_key(|task| (task.is_completed(), task.priority().rank(), task.due_date()));
    sorted
}

/// One entry of the category filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryOption {
    All,
    Named(String),
}

impl Display for CategoryOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryOption::All => write!(f, "All Categories"),
            CategoryOption::Named(name) => write!(f, "{}", name),
        }
    }
}

/// The "all" sentinel followed by each distinct category in first-seen order.
pub fn category_options(tasks: &[Task]) -> Vec<CategoryOption> {
    let mut seen = HashSet::new();
    let named = tasks
        .iter()
        .filter_map(Task::category)
        .filter(|category| !category.is_empty())
        .filter(|category| seen.insert(*category))
        .map(|category| CategoryOption::Named(category.to_string()));
    std::iter::once(CategoryOption::All).chain(named).collect()
}

/// Everything a presentation layer needs for one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard<'a> {
    /// Filtered and sorted; each task carries its own id for follow-up actions.
    pub tasks: Vec<&'a Task>,
    pub progress_percent: f64,
    pub completed_today: usize,
    pub total: usize,
    pub streak: u32,
    pub categories: Vec<CategoryOption>,
    pub calendar: Vec<CalendarCell>,
}

/// Computes a full refresh. Statistics and the calendar cover every task;
/// only the task list is filtered.
pub fn dashboard<'a>(
    tasks: &'a [Task],
    filter_state: &FilterState,
    today: NaiveDate,
) -> Dashboard<'a> {
    Dashboard {
        tasks: sort(filter(tasks, filter_state)),
        progress_percent: progress_percent(tasks),
        completed_today: completed_today(tasks, today),
        total: tasks.len(),
        streak: streak(tasks, today),
        categories: category_options(tasks),
        calendar: calendar_grid(tasks, today.year(), today.month(), today).unwrap_or_default(),
    }
}
