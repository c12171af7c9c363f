use chrono::{Days, TimeDelta};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use todo_list::reminder::{Permission, ReminderPolicy};

/// Base name of the optional config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "task-cli";
/// Prefix of environment overrides, e.g. `TASK_CLI__STORAGE__PATH`.
pub const ENV_PREFIX: &str = "TASK_CLI";

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub reminders: RemindersConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tasks.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RemindersConfig {
    pub title: String,
    pub lookahead_hours: u32,
    pub marker_retention_days: u32,
    pub poll_interval_secs: u64,
    pub permission: PermissionSetting,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            title: "Study Reminder".to_string(),
            lookahead_hours: 24,
            marker_retention_days: 30,
            poll_interval_secs: 30,
            permission: PermissionSetting::Ask,
        }
    }
}

/// Whether the console may show reminders. `ask` starts undetermined and
/// is granted the first time the scheduler requests it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSetting {
    #[default]
    Ask,
    Granted,
    Denied,
}

impl From<PermissionSetting> for Permission {
    fn from(setting: PermissionSetting) -> Self {
        match setting {
            PermissionSetting::Ask => Permission::Undetermined,
            PermissionSetting::Granted => Permission::Granted,
            PermissionSetting::Denied => Permission::Denied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Layers the config file (explicit path, or `task-cli.*` if present)
    /// under `TASK_CLI__*` environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn reminder_policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            title: self.reminders.title.clone(),
            lookahead: TimeDelta::hours(i64::from(self.reminders.lookahead_hours)),
            marker_retention: Days::new(u64::from(self.reminders.marker_retention_days)),
        }
    }

    /// Falls back to `WARN` for an unknown level name.
    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::WARN)
    }
}
