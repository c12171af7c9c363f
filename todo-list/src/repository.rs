use crate::store::{KeyValueStore, StorageError, TaskCollection, TaskStore};
use crate::task::{Task, TaskFields, TaskId, ValidationError};
use chrono::Utc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),
    #[error("no task with id {0}")]
    TaskNotFound(TaskId),
    #[error("no task ids left to assign")]
    IdsExhausted,
    #[error("cannot persist tasks")]
    Storage(#[from] StorageError),
}

/// An edit in progress. The task it points at stays stored until
/// [`TaskRepository::update`] commits the new fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    id: TaskId,
    pub fields: TaskFields,
}

impl EditDraft {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

/// CRUD over the in-memory task collection. Every mutation writes the whole
/// collection back through the [`TaskStore`] before it becomes visible.
#[derive(Debug)]
pub struct TaskRepository<S> {
    store: TaskStore<S>,
    collection: TaskCollection,
}

impl<S: KeyValueStore> TaskRepository<S> {
    pub fn open(store: S) -> Self {
        let store = TaskStore::new(store);
        let collection = store.load();
        debug!("opened repository with {} tasks", collection.tasks().len());
        Self { store, collection }
    }

    pub fn tasks(&self) -> &[Task] {
        self.collection.tasks()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.collection.get(id)
    }

    /// Validates and appends a new, incomplete task.
    ///
    /// # Errors
    ///
    /// * `RepositoryError::Validation` - blank name or missing due date; nothing is stored
    /// * `RepositoryError::IdsExhausted` - the id counter cannot advance any further
    /// * `RepositoryError::Storage` - the collection could not be written
    #[tracing::instrument(skip(self))]
    pub fn create(&mut self, fields: TaskFields) -> Result<Task, RepositoryError> {
        let fields = fields.validate()?;
        let mut next = self.collection.clone();
        let id = next.allocate_id().ok_or(RepositoryError::IdsExhausted)?;
        let task = Task::from_fields(id, fields, Utc::now());
        next.push(task.clone());
        self.commit(next)?;
        debug!(task_id = id, "created task");
        Ok(task)
    }

    /// Starts editing a task. Nothing changes until [`Self::update`] is called,
    /// so dropping the draft leaves the task as it was.
    pub fn start_edit(&self, id: TaskId) -> Result<EditDraft, RepositoryError> {
        let task = self.get(id).ok_or(RepositoryError::TaskNotFound(id))?;
        Ok(EditDraft {
            id,
            fields: task.to_fields(),
        })
    }

    /// Replaces a task's editable fields in one step. Id, creation time and
    /// completion state are kept.
    #[tracing::instrument(skip(self))]
    pub fn update(&mut self, id: TaskId, fields: TaskFields) -> Result<Task, RepositoryError> {
        let fields = fields.validate()?;
        let mut next = self.collection.clone();
        let task = next.get_mut(id).ok_or(RepositoryError::TaskNotFound(id))?;
        task.apply(fields);
        let task = task.clone();
        self.commit(next)?;
        debug!(task_id = id, "updated task");
        Ok(task)
    }

    /// Flips completion and returns the task as it is now.
    #[tracing::instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: TaskId) -> Result<Task, RepositoryError> {
        let mut next = self.collection.clone();
        let task = next.get_mut(id).ok_or(RepositoryError::TaskNotFound(id))?;
        task.toggle_completed(Utc::now());
        let task = task.clone();
        self.commit(next)?;
        debug!(task_id = id, completed = task.is_completed(), "toggled task");
        Ok(task)
    }

    /// Removes a task and returns it.
    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: TaskId) -> Result<Task, RepositoryError> {
        let mut next = self.collection.clone();
        let task = next.remove(id).ok_or(RepositoryError::TaskNotFound(id))?;
        self.commit(next)?;
        debug!(task_id = id, "deleted task");
        Ok(task)
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore<S> {
        &mut self.store
    }

    /// Tasks together with the underlying key-value store, for callers that
    /// read one while writing the other (reminder markers).
    pub fn tasks_and_store(&mut self) -> (&[Task], &mut S) {
        (self.collection.tasks(), self.store.inner_mut())
    }

    fn commit(&mut self, next: TaskCollection) -> Result<(), StorageError> {
        self.store.save(&next)?;
        self.collection = next;
        Ok(())
    }
}
