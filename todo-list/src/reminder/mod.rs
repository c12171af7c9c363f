//! Due-time reminders.
//!
//! Each task with a reminder time moves through three states:
//!
//! * `Unarmed` - no reminder time, or the task is completed
//! * `Pending` - armed, no marker stored yet
//! * `Fired` - the marker is stored; nothing more happens for that key
//!
//! [`ReminderScheduler::refresh`] is meant to run after every change to the
//! task list. It arms a one-shot timer for every pending reminder that falls
//! inside the lookahead window and cancels timers whose task went away.
//! [`ReminderScheduler::fire_due`] is called by whatever drives the clock
//! (see [`ReminderScheduler::next_deadline`]); it shows the notification and
//! writes the marker. Timers live in memory only, so after a restart pending
//! reminders are simply armed again.

mod key;
mod notifier;

pub use key::ReminderKey;
pub use notifier::{Notifier, NotifyError, Permission};

#[cfg(test)]
pub use notifier::MockNotifier;

use crate::store::{KeyValueStore, StorageError};
use crate::task::{Task, TaskId};
use chrono::{DateTime, Days, Local, NaiveDate, TimeDelta};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Value written under a marker key.
pub const MARKER_VALUE: &str = "yes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// Title of every reminder notification.
    pub title: String,
    /// Only reminders due within this window from now are armed.
    pub lookahead: TimeDelta,
    /// Markers for due dates older than this are garbage-collected.
    pub marker_retention: Days,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            title: "Study Reminder".to_string(),
            lookahead: TimeDelta::hours(24),
            marker_retention: Days::new(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Unarmed,
    Pending(ReminderKey),
    Fired(ReminderKey),
}

pub fn reminder_state<S: KeyValueStore>(
    task: &Task,
    markers: &S,
) -> Result<ReminderState, StorageError> {
    let Some(key) = ReminderKey::for_task(task).filter(|_| !task.is_completed()) else {
        return Ok(ReminderState::Unarmed);
    };
    if markers.get(&key.marker_key())?.is_some() {
        Ok(ReminderState::Fired(key))
    } else {
        Ok(ReminderState::Pending(key))
    }
}

/// A reminder armed to fire at `fire_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reminder {
    pub key: ReminderKey,
    pub fire_at: DateTime<Local>,
}

/// Pending reminders due strictly after `now` and less than the lookahead
/// window away. Reminders already in the past are never armed.
pub fn plan<S: KeyValueStore>(
    tasks: &[Task],
    markers: &S,
    now: DateTime<Local>,
    policy: &ReminderPolicy,
) -> Result<Vec<Reminder>, StorageError> {
    let mut planned = Vec::new();
    for task in tasks {
        let ReminderState::Pending(key) = reminder_state(task, markers)? else {
            continue;
        };
        let Some(fire_at) = key.due_instant() else {
            debug!("{key} falls into a DST gap, skipping");
            continue;
        };
        let remaining = fire_at - now;
        if remaining > TimeDelta::zero() && remaining < policy.lookahead {
            planned.push(Reminder { key, fire_at });
        }
    }
    Ok(planned)
}

/// Body text of the notification for `task`.
pub fn notification_body(task: &Task) -> String {
    let due_at = task
        .reminder_time()
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_default();
    format!(
        "{} ({}) due at {}",
        task.name(),
        task.category().unwrap_or("General"),
        due_at
    )
}

/// Removes markers of tasks that no longer exist and markers whose due date
/// is older than the retention window. Returns how many were removed.
pub fn prune_markers<S: KeyValueStore>(
    tasks: &[Task],
    store: &mut S,
    today: NaiveDate,
    retention: Days,
) -> Result<usize, StorageError> {
    let live_ids: HashSet<TaskId> = tasks.iter().map(Task::id).collect();
    let cutoff = today.checked_sub_days(retention).unwrap_or(NaiveDate::MIN);

    let mut removed = 0;
    for store_key in store.keys()? {
        let Some(key) = ReminderKey::from_marker_key(&store_key) else {
            continue;
        };
        if !live_ids.contains(&key.task_id) || key.due_date < cutoff {
            store.remove(&store_key)?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!("pruned {removed} reminder markers");
    }
    Ok(removed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Permission was undetermined and has been requested; nothing armed.
    PermissionRequested,
    /// Notifications are denied; all timers dropped.
    Denied,
    Armed { newly_armed: usize, pending: usize },
}

/// Keeps the table of armed one-shot timers, keyed by [`ReminderKey`].
pub struct ReminderScheduler<N> {
    notifier: N,
    policy: ReminderPolicy,
    timers: BTreeMap<ReminderKey, Reminder>,
}

impl<N: Notifier> ReminderScheduler<N> {
    pub fn new(notifier: N, policy: ReminderPolicy) -> Self {
        Self {
            notifier,
            policy,
            timers: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> &ReminderPolicy {
        &self.policy
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Re-evaluates every task. Arming the same key twice is a no-op, and a
    /// timer whose task was deleted, completed or re-timed is cancelled.
    pub fn refresh<S: KeyValueStore>(
        &mut self,
        tasks: &[Task],
        store: &mut S,
        now: DateTime<Local>,
    ) -> Result<RefreshOutcome, StorageError> {
        prune_markers(tasks, store, now.date_naive(), self.policy.marker_retention)?;

        match self.notifier.permission() {
            Permission::Undetermined => {
                debug!("notification permission undetermined, requesting it");
                self.notifier.request_permission();
                return Ok(RefreshOutcome::PermissionRequested);
            }
            Permission::Denied => {
                self.timers.clear();
                return Ok(RefreshOutcome::Denied);
            }
            Permission::Granted => {}
        }

        let armable: HashSet<ReminderKey> = tasks
            .iter()
            .filter(|task| !task.is_completed())
            .filter_map(ReminderKey::for_task)
            .collect();
        self.timers.retain(|key, _| {
            let keep = armable.contains(key);
            if !keep {
                debug!("cancelled reminder for {key}");
            }
            keep
        });

        let mut newly_armed = 0;
        for reminder in plan(tasks, store, now, &self.policy)? {
            if !self.timers.contains_key(&reminder.key) {
                debug!("armed reminder for {} at {}", reminder.key, reminder.fire_at);
                self.timers.insert(reminder.key, reminder);
                newly_armed += 1;
            }
        }

        Ok(RefreshOutcome::Armed {
            newly_armed,
            pending: self.timers.len(),
        })
    }

    pub fn is_armed(&self, key: &ReminderKey) -> bool {
        self.timers.contains_key(key)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Reminder> {
        self.timers.values()
    }

    /// Earliest instant any armed timer fires.
    pub fn next_deadline(&self) -> Option<DateTime<Local>> {
        self.timers.values().map(|reminder| reminder.fire_at).min()
    }

    /// Fires every timer that is due at `now`. Before notifying, the task is
    /// looked up again: a deleted, completed or re-timed task is skipped, as
    /// is a revoked permission. Returns the keys whose notification was shown.
    pub fn fire_due<S: KeyValueStore>(
        &mut self,
        tasks: &[Task],
        store: &mut S,
        now: DateTime<Local>,
    ) -> Result<Vec<ReminderKey>, StorageError> {
        let due: Vec<ReminderKey> = self
            .timers
            .values()
            .filter(|reminder| reminder.fire_at <= now)
            .map(|reminder| reminder.key)
            .collect();

        let mut fired = Vec::new();
        for key in due {
            self.timers.remove(&key);

            let Some(task) = tasks
                .iter()
                .find(|task| !task.is_completed() && ReminderKey::for_task(task) == Some(key))
            else {
                debug!("skipping reminder for {key}, task changed");
                continue;
            };
            if self.notifier.permission() != Permission::Granted {
                debug!("skipping reminder for {key}, permission not granted");
                continue;
            }
            let marker = key.marker_key();
            if store.get(&marker)?.is_some() {
                continue;
            }

            match self.notifier.notify(&self.policy.title, &notification_body(task)) {
                Ok(()) => {
                    store.set(&marker, MARKER_VALUE)?;
                    info!("reminder shown for {key}");
                    fired.push(key);
                }
                Err(e) => warn!("cannot show reminder for {key}: {e}"),
            }
        }
        Ok(fired)
    }
}
