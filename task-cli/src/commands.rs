use crate::cli::{AddArgs, Commands, DarkModeSwitch, EditArgs, ListArgs};
use crate::config::Config;
use crate::notifier::ConsoleNotifier;
use crate::render;
use chrono::{DateTime, Datelike, Local, NaiveDate};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use todo_list::reminder::{Notifier, ReminderKey, ReminderScheduler};
use todo_list::view::{self, FilterState};
use todo_list::{FileStore, KeyValueStore, RepositoryError, StorageError, TaskId, TaskRepository};
use tracing::{debug, info, warn};

/// Runs one command against the store at `store_path`.
pub async fn run(
    command: Commands,
    store_path: &Path,
    config: &Config,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let open = || -> anyhow::Result<TaskRepository<FileStore>> {
        Ok(TaskRepository::open(FileStore::open(store_path)?))
    };
    let today = Local::now().date_naive();
    match command {
        Commands::Add(args) => add(&mut open()?, args, out),
        Commands::List(args) => list(&open()?, args, today, out),
        Commands::Done { id } => toggle(&mut open()?, id, out),
        Commands::Edit { id, changes } => edit(&mut open()?, id, changes, out),
        Commands::Delete { id } => delete(&mut open()?, id, out),
        Commands::Calendar { year, month } => calendar(&open()?, year, month, today, out),
        Commands::DarkMode { switch } => dark_mode(&mut open()?, switch, out),
        Commands::Watch => watch(store_path, config).await,
    }
}

/// Invalid input is dropped with a warning; nothing is stored.
pub fn add<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    args: AddArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match repo.create(args.into()) {
        Ok(task) => writeln!(out, "Task added with ID {}", task.id())?,
        Err(RepositoryError::Validation(e)) => warn!("task not added: {e}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn list<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    args: ListArgs,
    today: NaiveDate,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut filter = FilterState::new()
        .with_priority(args.priority)
        .with_search(&args.search);
    if let Some(category) = args.category {
        filter = filter.with_category(category);
    }
    let dashboard = view::dashboard(repo.tasks(), &filter, today);
    writeln!(out, "{}", render::dashboard(&dashboard))?;
    Ok(())
}

pub fn toggle<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: TaskId,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let task = repo.toggle_complete(id)?;
    if task.is_completed() {
        writeln!(out, "Task {id} marked done")?;
    } else {
        writeln!(out, "Task {id} reopened")?;
    }
    Ok(())
}

pub fn edit<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: TaskId,
    changes: EditArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut draft = repo.start_edit(id)?;
    changes.apply_to(&mut draft.fields);
    match repo.update(draft.id(), draft.fields) {
        Ok(task) => writeln!(out, "Task {} updated", task.id())?,
        Err(RepositoryError::Validation(e)) => warn!("task {id} not changed: {e}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn delete<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: TaskId,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let task = repo.delete(id)?;
    writeln!(out, "Task {} deleted: {}", id, task.name())?;
    Ok(())
}

pub fn calendar<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow::anyhow!("{year}-{month} is not a valid month"))?;
    let cells = view::calendar_grid(repo.tasks(), year, month, today).unwrap_or_default();
    writeln!(out, "{}", render::calendar(first, &cells))?;
    Ok(())
}

pub fn dark_mode<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    switch: DarkModeSwitch,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let store = repo.store_mut();
    let enabled = match switch {
        DarkModeSwitch::On => true,
        DarkModeSwitch::Off => false,
        DarkModeSwitch::Toggle => !store.dark_mode(),
    };
    store.set_dark_mode(enabled)?;
    writeln!(out, "Dark mode {}", if enabled { "on" } else { "off" })?;
    Ok(())
}

/// Re-reads the store, re-arms reminders and fires whatever is due at `now`.
/// Returns the reminders that were shown.
fn tick<N: Notifier>(
    scheduler: &mut ReminderScheduler<N>,
    store_path: &Path,
    now: DateTime<Local>,
) -> Result<Vec<ReminderKey>, StorageError> {
    let mut repo = TaskRepository::open(FileStore::open(store_path)?);
    let (tasks, store) = repo.tasks_and_store();
    let outcome = scheduler.refresh(tasks, store, now)?;
    debug!(?outcome, "refreshed reminders");
    scheduler.fire_due(tasks, store, now)
}

/// Polls the store until Ctrl-C, sleeping until the next reminder or the
/// poll interval, whichever comes first. Storage errors are logged and
/// retried on the next tick.
pub async fn watch(store_path: &Path, config: &Config) -> anyhow::Result<()> {
    let notifier = ConsoleNotifier::new(config.reminders.permission);
    let mut scheduler = ReminderScheduler::new(notifier, config.reminder_policy());
    let poll = Duration::from_secs(config.reminders.poll_interval_secs.max(1));
    info!("watching {} for reminders", store_path.display());

    loop {
        if let Err(e) = tick(&mut scheduler, store_path, Local::now()) {
            warn!("reminder tick failed: {e}");
        }

        let wait = scheduler
            .next_deadline()
            .map(|deadline| (deadline - Local::now()).to_std().unwrap_or(Duration::ZERO).min(poll))
            .unwrap_or(poll);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("stopping reminder watch");
                return Ok(());
            }
        }
    }
}
