use crate::task::Task;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Share of completed tasks in percent, `0.0` for an empty collection.
pub fn progress_percent(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|task| task.is_completed()).count();
    completed as f64 / tasks.len() as f64 * 100.0
}

/// Number of tasks whose completion falls on `today`.
pub fn completed_today(tasks: &[Task], today: NaiveDate) -> usize {
    tasks
        .iter()
        .filter(|task| task.completed_on() == Some(today))
        .count()
}

struct StreakWalk {
    /// Run of consecutive days ending on `last_day`.
    current: u32,
    longest: u32,
    last_day: NaiveDate,
}

fn walk_completion_days(tasks: &[Task]) -> Option<StreakWalk> {
    let days: BTreeSet<NaiveDate> = tasks.iter().filter_map(Task::completed_on).collect();
    let mut days = days.into_iter();
    let first = days.next()?;

    let mut walk = StreakWalk {
        current: 1,
        longest: 1,
        last_day: first,
    };
    for day in days {
        if (day - walk.last_day).num_days() == 1 {
            walk.current += 1;
        } else {
            walk.current = 1;
        }
        walk.longest = walk.longest.max(walk.current);
        walk.last_day = day;
    }
    Some(walk)
}

/// Consecutive days with at least one completion, counting back from the
/// latest completion day. Only an active streak counts: if nothing was
/// completed `today` the result is 0.
pub fn streak(tasks: &[Task], today: NaiveDate) -> u32 {
    match walk_completion_days(tasks) {
        Some(walk) if walk.last_day == today => walk.current,
        _ => 0,
    }
}

/// Longest run of consecutive completion days ever recorded.
pub fn longest_streak(tasks: &[Task]) -> u32 {
    walk_completion_days(tasks).map_or(0, |walk| walk.longest)
}
