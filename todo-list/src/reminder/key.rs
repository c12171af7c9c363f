use crate::task::{Task, TaskId};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use std::fmt::{Display, Formatter};

const MARKER_PREFIX: &str = "notified-";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Identifies one reminder occurrence. Editing a task's due date or reminder
/// time produces a new key, so the new time can fire even if the old one did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReminderKey {
    pub task_id: TaskId,
    pub due_date: NaiveDate,
    pub reminder_time: NaiveTime,
}

impl ReminderKey {
    /// `None` when the task has no reminder time.
    pub fn for_task(task: &Task) -> Option<Self> {
        Some(Self {
            task_id: task.id(),
            due_date: task.due_date(),
            reminder_time: task.reminder_time()?,
        })
    }

    /// Store key of the "already notified" marker, `notified-{id}-{date}-{HH:MM}`.
    pub fn marker_key(&self) -> String {
        format!(
            "{MARKER_PREFIX}{}-{}-{}",
            self.task_id,
            self.due_date.format(DATE_FORMAT),
            self.reminder_time.format(TIME_FORMAT)
        )
    }

    /// Parses a marker key back. Any other store key yields `None`.
    pub fn from_marker_key(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(MARKER_PREFIX)?;
        let (task_id, rest) = rest.split_once('-')?;
        let (due_date, reminder_time) = rest.split_at_checked(10)?;
        let reminder_time = reminder_time.strip_prefix('-')?;
        Some(Self {
            task_id: task_id.parse().ok()?,
            due_date: NaiveDate::parse_from_str(due_date, DATE_FORMAT).ok()?,
            reminder_time: NaiveTime::parse_from_str(reminder_time, TIME_FORMAT).ok()?,
        })
    }

    /// Local instant the reminder is due. `None` only if the wall-clock time
    /// does not exist that day (a DST gap).
    pub fn due_instant(&self) -> Option<DateTime<Local>> {
        Local
            .from_local_datetime(&self.due_date.and_time(self.reminder_time))
            .earliest()
    }
}

impl Display for ReminderKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "task {} at {} {}",
            self.task_id,
            self.due_date.format(DATE_FORMAT),
            self.reminder_time.format(TIME_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::test_support::{TaskBuilder, date};

    #[test]
    fn marker_key_round_trips() {
        // Arrange
        let task = TaskBuilder::new(12, "Quiz", "2024-05-01").reminder("07:05").build();
        let key = ReminderKey::for_task(&task).unwrap();

        // Act
        let marker = key.marker_key();

        // Assert
        assert_eq!(marker, "notified-12-2024-05-01-07:05");
        assert_eq!(ReminderKey::from_marker_key(&marker), Some(key));
    }

    #[test]
    fn task_without_reminder_has_no_key() {
        let task = TaskBuilder::new(1, "Quiz", "2024-05-01").build();
        assert_eq!(ReminderKey::for_task(&task), None);
    }

    #[test]
    fn unrelated_keys_do_not_parse() {
        assert_eq!(ReminderKey::from_marker_key("tasks"), None);
        assert_eq!(ReminderKey::from_marker_key("darkMode"), None);
        assert_eq!(ReminderKey::from_marker_key("notified-x-2024-05-01-07:05"), None);
        assert_eq!(ReminderKey::from_marker_key("notified-1-2024-05-01"), None);
    }

    #[test]
    fn due_instant_combines_date_and_time() {
        // Arrange
        let task = TaskBuilder::new(1, "Quiz", "2024-05-01").reminder("18:30").build();
        let key = ReminderKey::for_task(&task).unwrap();

        // Act
        let instant = key.due_instant().unwrap();

        // Assert
        assert_eq!(instant.date_naive(), date("2024-05-01"));
        assert_eq!(instant.time(), NaiveTime::from_hms_opt(18, 30, 0).unwrap());
    }
}
