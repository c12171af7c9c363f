use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Stable surrogate identifier assigned when a task is created. Never reused.
pub type TaskId = u32;

/// Reasons a task payload is rejected before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task name must not be empty")]
    EmptyName,
    #[error("task due date is required")]
    MissingDueDate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown priority '{0}', expected High, Medium or Low")]
pub struct ParsePriorityError(String);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl Priority {
    /// Sort rank, lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

/// A single tracked task as it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) due_date: NaiveDate,
    #[serde(default, with = "hh_mm")]
    pub(crate) reminder_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub(crate) category: Option<String>,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub(crate) priority: Priority,
    #[serde(default)]
    pub(crate) completed: bool,
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub(crate) fn from_fields(id: TaskId, fields: ValidFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            due_date: fields.due_date,
            reminder_time: fields.reminder_time,
            category: fields.category,
            priority: fields.priority,
            completed: false,
            created_at,
            completed_at: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn reminder_time(&self) -> Option<NaiveTime> {
        self.reminder_time
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Local calendar date the task was completed on, if it is completed.
    pub fn completed_on(&self) -> Option<NaiveDate> {
        self.completed_at
            .map(|completed_at| completed_at.with_timezone(&Local).date_naive())
    }

    /// Flips completion. `completed_at` follows `completed` in both directions.
    pub(crate) fn toggle_completed(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = self.completed.then_some(now);
    }

    /// Makes `completed_at` agree with `completed`. The flag wins: a stray
    /// stamp on an open task is dropped, and a completed task without one is
    /// stamped with its creation time. Returns whether anything changed.
    pub(crate) fn repair_completion(&mut self) -> bool {
        match (self.completed, self.completed_at) {
            (false, Some(_)) => self.completed_at = None,
            (true, None) => self.completed_at = Some(self.created_at),
            _ => return false,
        }
        true
    }

    /// Replaces the editable fields, leaving identity and completion untouched.
    pub(crate) fn apply(&mut self, fields: ValidFields) {
        self.name = fields.name;
        self.due_date = fields.due_date;
        self.reminder_time = fields.reminder_time;
        self.category = fields.category;
        self.priority = fields.priority;
    }

    /// The editable fields of this task, e.g. to prefill an edit form.
    pub fn to_fields(&self) -> TaskFields {
        TaskFields {
            name: self.name.clone(),
            due_date: Some(self.due_date),
            reminder_time: self.reminder_time,
            category: self.category.clone(),
            priority: self.priority,
        }
    }
}

/// User-supplied payload for creating or editing a task.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub reminder_time: Option<NaiveTime>,
    pub category: Option<String>,
    pub priority: Priority,
}

impl TaskFields {
    pub fn new(name: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            due_date: Some(due_date),
            ..Default::default()
        }
    }

    pub fn with_reminder(mut self, reminder_time: NaiveTime) -> Self {
        self.reminder_time = Some(reminder_time);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub(crate) fn validate(self) -> Result<ValidFields, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let due_date = self.due_date.ok_or(ValidationError::MissingDueDate)?;
        let category = self
            .category
            .map(|category| category.trim().to_string())
            .filter(|category| !category.is_empty());

        Ok(ValidFields {
            name: name.to_string(),
            due_date,
            reminder_time: self.reminder_time,
            category,
            priority: self.priority,
        })
    }
}

/// Fields that passed validation: trimmed non-empty name, due date present,
/// blank category collapsed to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidFields {
    name: String,
    due_date: NaiveDate,
    reminder_time: Option<NaiveTime>,
    category: Option<String>,
    priority: Priority,
}

/// Reminder times are stored as `HH:MM`; blank strings mean "no reminder".
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_str(&time.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => NaiveTime::parse_from_str(raw, FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()))
}

fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Priority, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default())
}
