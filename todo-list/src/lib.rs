//! Task-state engine for a personal task tracker.
//!
//! Tasks are kept in a [`TaskRepository`] that persists the whole collection
//! through an opaque [`KeyValueStore`]. The [`view`] module derives what a
//! front end shows (filtered and sorted lists, progress, streaks, a month
//! calendar) and the [`reminder`] module decides when due-time notifications
//! fire.
pub mod reminder;
pub mod repository;
pub mod store;
pub mod task;
pub mod view;

pub use repository::{EditDraft, RepositoryError, TaskRepository};
pub use store::{FileStore, InMemoryStore, KeyValueStore, StorageError, TaskCollection, TaskStore};
pub use task::{ParsePriorityError, Priority, Task, TaskFields, TaskId, ValidationError};
pub use view::{Dashboard, FilterState};

#[cfg(test)]
mod scenario_tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn create_filter_and_sort_reading_tasks() {
        // Arrange
        let mut repo = TaskRepository::open(InMemoryStore::new());
        repo.create(
            TaskFields::new("Read ch.1", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
                .with_priority(Priority::High),
        )
        .unwrap();
        repo.create(
            TaskFields::new("Read ch.2", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
                .with_priority(Priority::Low),
        )
        .unwrap();

        // Act
        let high =
            view::filter(repo.tasks(), &FilterState::new().with_priority(Some(Priority::High)));
        let sorted = view::sort(repo.tasks());

        // Assert
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].name(), "Read ch.1");
        let names: Vec<_> = sorted.iter().map(|task| task.name()).collect();
        assert_eq!(names, vec!["Read ch.1", "Read ch.2"]);
    }
}
