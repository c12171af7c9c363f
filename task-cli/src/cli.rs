use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use todo_list::{Priority, TaskFields, TaskId};

#[derive(Parser, Debug)]
#[command(version, about = "Personal task tracker with due-date reminders")]
pub struct Cli {
    /// Task store file, overrides `storage.path` from the configuration
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// Configuration file (defaults to `task-cli.toml` if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Add a new task
    Add(AddArgs),
    /// Show tasks, progress, streak and categories
    List(ListArgs),
    /// Toggle a task between done and not done
    Done { id: TaskId },
    /// Change fields of a task
    Edit {
        id: TaskId,
        #[command(flatten)]
        changes: EditArgs,
    },
    /// Delete a task
    Delete { id: TaskId },
    /// Show a month calendar with due dates
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Show or change the dark mode preference
    DarkMode {
        #[arg(value_enum, default_value_t = DarkModeSwitch::Toggle)]
        switch: DarkModeSwitch,
    },
    /// Stay running and show reminders when they are due
    Watch,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub name: String,
    /// Due date, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub due: NaiveDate,
    /// Reminder time on the due date, HH:MM
    #[arg(long, value_parser = parse_time)]
    pub reminder: Option<NaiveTime>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, default_value_t = Priority::Low)]
    pub priority: Priority,
}

impl From<AddArgs> for TaskFields {
    fn from(args: AddArgs) -> Self {
        TaskFields {
            name: args.name,
            due_date: Some(args.due),
            reminder_time: args.reminder,
            category: args.category,
            priority: args.priority,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Case-insensitive text to look for in task names
    #[arg(long, default_value = "")]
    pub search: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,
    #[arg(long, value_parser = parse_time, conflicts_with = "clear_reminder")]
    pub reminder: Option<NaiveTime>,
    /// Remove the reminder
    #[arg(long)]
    pub clear_reminder: bool,
    /// New category, an empty value removes it
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
}

impl EditArgs {
    /// Overwrites only the fields that were given.
    pub fn apply_to(self, fields: &mut TaskFields) {
        if let Some(name) = self.name {
            fields.name = name;
        }
        if let Some(due) = self.due {
            fields.due_date = Some(due);
        }
        if self.clear_reminder {
            fields.reminder_time = None;
        } else if let Some(reminder) = self.reminder {
            fields.reminder_time = Some(reminder);
        }
        if let Some(category) = self.category {
            fields.category = Some(category);
        }
        if let Some(priority) = self.priority {
            fields.priority = priority;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DarkModeSwitch {
    On,
    Off,
    Toggle,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM: {e}"))
}
