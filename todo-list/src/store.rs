//! Persistence for the task collection.
//!
//! The engine treats storage as an opaque string key-value mapping, the same
//! shape a browser's local storage has. [`TaskStore`] keeps the whole task
//! collection under a single key and rewrites it in one `set` on every save.

use crate::task::{Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Key holding the serialized task collection.
pub const TASKS_KEY: &str = "tasks";
/// Key holding the dark-mode preference as `"true"`/`"false"`.
pub const DARK_MODE_KEY: &str = "darkMode";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cannot access store file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize store contents")]
    Serde(#[from] serde_json::Error),
}

/// Opaque persistent string mapping.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Volatile store, handy for tests and embedding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InMemoryStore {
    entries: BTreeMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Store backed by one JSON object file. Every write rewrites the file
/// through a sibling temp file and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; a file
    /// that is not a UTF-8 JSON object of strings is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(contents) => match serde_json::from_slice(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("store file {} is corrupt, starting fresh: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("store file {} does not exist yet", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `entries` to disk and adopts them only once the rename succeeded.
    fn commit(&mut self, entries: BTreeMap<String, String>) -> Result<(), StorageError> {
        self.flush(&entries)?;
        self.entries = entries;
        Ok(())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.clone();
        entries.insert(key.to_string(), value.to_string());
        self.commit(entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut entries = self.entries.clone();
        entries.remove(key);
        self.commit(entries)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Every task plus the id counter. This is the unit that gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCollection {
    next_id: TaskId,
    tasks: Vec<Task>,
}

impl Default for TaskCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskCollection {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            tasks: Vec::new(),
        }
    }

    /// Adopts tasks saved without ids, numbering them in stored order.
    fn from_legacy(tasks: Vec<Task>) -> Self {
        let mut collection = Self::new();
        for mut task in tasks {
            task.id = collection.next_id;
            collection.next_id += 1;
            collection.tasks.push(task);
        }
        collection
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Hands out the next id, or `None` once the id space is used up.
    pub(crate) fn allocate_id(&mut self) -> Option<TaskId> {
        let id = self.next_id;
        self.next_id = id.checked_add(1)?;
        Some(id)
    }

    pub(crate) fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub(crate) fn remove(&mut self, id: TaskId) -> Option<Task> {
        let position = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(position))
    }

    /// Keeps `next_id` ahead of every stored id so ids are never handed out
    /// twice. Returns `false` when no id fits above the largest stored one.
    fn repair_next_id(&mut self) -> bool {
        let Some(max_id) = self.tasks.iter().map(|task| task.id).max() else {
            return true;
        };
        if self.next_id > max_id {
            return true;
        }
        warn!("stored next_id {} is behind task id {max_id}", self.next_id);
        match max_id.checked_add(1) {
            Some(next_id) => {
                self.next_id = next_id;
                true
            }
            None => false,
        }
    }

    /// Brings every task's completion stamp in line with its flag.
    fn repair_completion(&mut self) {
        for task in &mut self.tasks {
            if task.repair_completion() {
                warn!(task_id = task.id, "repaired inconsistent completion state");
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTasks {
    Current(TaskCollection),
    Legacy(Vec<Task>),
}

/// Loads and saves the task collection over a [`KeyValueStore`].
#[derive(Debug)]
pub struct TaskStore<S> {
    store: S,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reads the collection. Absent, unreadable or corrupt data yields an
    /// empty collection.
    pub fn load(&self) -> TaskCollection {
        let raw = match self.store.get(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return TaskCollection::new(),
            Err(e) => {
                warn!("cannot read tasks, starting fresh: {e}");
                return TaskCollection::new();
            }
        };

        let mut collection = match serde_json::from_str(&raw) {
            Ok(StoredTasks::Current(collection)) => collection,
            Ok(StoredTasks::Legacy(tasks)) => {
                debug!("adopting {} tasks stored without ids", tasks.len());
                TaskCollection::from_legacy(tasks)
            }
            Err(e) => {
                warn!("stored tasks are corrupt, starting fresh: {e}");
                TaskCollection::new()
            }
        };
        if !collection.repair_next_id() {
            warn!("stored task ids exhaust the id space, starting fresh");
            return TaskCollection::new();
        }
        collection.repair_completion();
        collection
    }

    /// Overwrites the stored collection in a single write.
    pub fn save(&mut self, collection: &TaskCollection) -> Result<(), StorageError> {
        let raw = serde_json::to_string(collection)?;
        self.store.set(TASKS_KEY, &raw)?;
        debug!("saved {} tasks", collection.tasks.len());
        Ok(())
    }

    pub fn dark_mode(&self) -> bool {
        match self.store.get(DARK_MODE_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!("cannot read dark mode preference: {e}");
                false
            }
        }
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<(), StorageError> {
        self.store.set(DARK_MODE_KEY, if enabled { "true" } else { "false" })
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use crate::task::test_support::TaskBuilder;

    fn sample_collection() -> TaskCollection {
        let mut collection = TaskCollection::new();
        for (name, due) in [("Read ch.1", "2024-05-01"), ("Read ch.2", "2024-05-02")] {
            let id = collection.allocate_id().unwrap();
            collection.push(
                TaskBuilder::new(id, name, due)
                    .priority(Priority::High)
                    .reminder("08:00")
                    .build(),
            );
        }
        collection
    }

    mod task_store_tests {
        use super::*;

        #[test]
        fn load_of_empty_store_is_empty() {
            // Arrange
            let store = TaskStore::new(InMemoryStore::new());

            // Act
            let collection = store.load();

            // Assert
            assert!(collection.tasks().is_empty());
            assert_eq!(collection.next_id(), 1);
        }

        #[test]
        fn load_of_corrupt_blob_is_empty() {
            // Arrange
            let mut kv = InMemoryStore::new();
            kv.set(TASKS_KEY, "{not json").unwrap();
            let store = TaskStore::new(kv);

            // Act
            let collection = store.load();

            // Assert
            assert!(collection.tasks().is_empty());
        }

        #[test]
        fn save_then_load_returns_same_collection() {
            // Arrange
            let mut store = TaskStore::new(InMemoryStore::new());
            let collection = sample_collection();

            // Act
            store.save(&collection).unwrap();
            let loaded = store.load();

            // Assert
            assert_eq!(loaded, collection);
        }

        #[test]
        fn resaving_a_loaded_collection_is_byte_identical() {
            // Arrange
            let mut store = TaskStore::new(InMemoryStore::new());
            store.save(&sample_collection()).unwrap();
            let first = store.inner().get(TASKS_KEY).unwrap();

            // Act
            let loaded = store.load();
            store.save(&loaded).unwrap();
            let second = store.inner().get(TASKS_KEY).unwrap();

            // Assert
            assert_eq!(first, second);
        }

        #[test]
        fn legacy_array_gets_sequential_ids() {
            // Arrange
            let legacy = r#"[
                {"name":"A","dueDate":"2024-05-01","reminderTime":"","category":"",
                 "priority":"Low","completed":false,"createdAt":"2024-04-01T00:00:00.000Z",
                 "completedAt":null},
                {"name":"B","dueDate":"2024-05-02","reminderTime":"18:30","category":"Math",
                 "priority":"High","completed":true,"createdAt":"2024-04-01T00:00:00.000Z",
                 "completedAt":"2024-04-02T10:00:00.000Z"}
            ]"#;
            let mut kv = InMemoryStore::new();
            kv.set(TASKS_KEY, legacy).unwrap();
            let store = TaskStore::new(kv);

            // Act
            let collection = store.load();

            // Assert
            let ids: Vec<_> = collection.tasks().iter().map(Task::id).collect();
            assert_eq!(ids, vec![1, 2]);
            assert_eq!(collection.next_id(), 3);
            assert_eq!(collection.tasks()[1].category(), Some("Math"));
            assert!(collection.tasks()[1].is_completed());
        }

        #[test]
        fn next_id_is_repaired_when_behind() {
            // Arrange
            let raw = r#"{"nextId":1,"tasks":[{"id":5,"name":"A","dueDate":"2024-05-01",
                          "createdAt":"2024-04-01T00:00:00Z"}]}"#;
            let mut kv = InMemoryStore::new();
            kv.set(TASKS_KEY, raw).unwrap();

            // Act
            let collection = TaskStore::new(kv).load();

            // Assert
            assert_eq!(collection.next_id(), 6);
        }

        #[test]
        fn largest_possible_id_loads_as_empty() {
            // Arrange
            let raw = r#"{"nextId":1,"tasks":[{"id":4294967295,"name":"A","dueDate":"2024-05-01",
                          "createdAt":"2024-04-01T00:00:00Z"}]}"#;
            let mut kv = InMemoryStore::new();
            kv.set(TASKS_KEY, raw).unwrap();

            // Act
            let collection = TaskStore::new(kv).load();

            // Assert
            assert!(collection.tasks().is_empty());
            assert_eq!(collection.next_id(), 1);
        }

        #[test]
        fn exhausted_counter_stops_allocating() {
            let raw = r#"{"nextId":4294967295,"tasks":[]}"#;
            let mut kv = InMemoryStore::new();
            kv.set(TASKS_KEY, raw).unwrap();
            let mut collection = TaskStore::new(kv).load();

            assert_eq!(collection.allocate_id(), None);
            assert_eq!(collection.next_id(), TaskId::MAX);
        }

        #[test]
        fn completion_stamp_is_repaired_on_load() {
            // Arrange
            let legacy = r#"[
                {"name":"A","dueDate":"2024-05-01","priority":"Low","completed":false,
                 "createdAt":"2024-04-01T00:00:00.000Z","completedAt":"2024-04-02T10:00:00.000Z"},
                {"name":"B","dueDate":"2024-05-02","priority":"High","completed":true,
                 "createdAt":"2024-04-01T00:00:00.000Z","completedAt":null}
            ]"#;
            let mut kv = InMemoryStore::new();
            kv.set(TASKS_KEY, legacy).unwrap();

            // Act
            let collection = TaskStore::new(kv).load();

            // Assert
            let [open, done] = collection.tasks() else {
                panic!("expected two tasks");
            };
            assert!(!open.is_completed());
            assert_eq!(open.completed_at(), None);
            assert!(done.is_completed());
            assert_eq!(done.completed_at(), Some(done.created_at()));
        }

        #[test]
        fn dark_mode_defaults_off_and_persists() {
            // Arrange
            let mut store = TaskStore::new(InMemoryStore::new());

            // Act & Assert
            assert!(!store.dark_mode());
            store.set_dark_mode(true).unwrap();
            assert!(store.dark_mode());
            assert_eq!(store.inner().get(DARK_MODE_KEY).unwrap().as_deref(), Some("true"));
        }
    }

    mod file_store_tests {
        use super::*;

        #[test]
        fn missing_file_opens_empty() {
            // Arrange
            let dir = tempfile::tempdir().unwrap();

            // Act
            let store = FileStore::open(dir.path().join("store.json")).unwrap();

            // Assert
            assert!(store.keys().unwrap().is_empty());
        }

        #[test]
        fn values_survive_reopen() {
            // Arrange
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("store.json");
            let mut store = FileStore::open(&path).unwrap();

            // Act
            store.set("darkMode", "true").unwrap();
            store.set("notified-1-2024-05-01-08:00", "yes").unwrap();
            store.remove("notified-1-2024-05-01-08:00").unwrap();
            let reopened = FileStore::open(&path).unwrap();

            // Assert
            assert_eq!(reopened.get("darkMode").unwrap().as_deref(), Some("true"));
            assert_eq!(reopened.keys().unwrap(), vec!["darkMode".to_string()]);
        }

        #[test]
        fn corrupt_file_opens_empty() {
            // Arrange
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("store.json");
            fs::write(&path, "[1, 2, 3").unwrap();

            // Act
            let store = FileStore::open(&path).unwrap();

            // Assert
            assert!(store.keys().unwrap().is_empty());
        }

        #[test]
        fn non_utf8_file_opens_empty() {
            // Arrange
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("store.json");
            fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

            // Act
            let store = FileStore::open(&path).unwrap();

            // Assert
            assert!(store.keys().unwrap().is_empty());
        }

        #[test]
        fn failed_write_leaves_store_unchanged() {
            // Arrange
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("store.json");
            let mut store = FileStore::open(&path).unwrap();
            store.set("darkMode", "false").unwrap();
            fs::create_dir(dir.path().join("store.tmp")).unwrap();

            // Act
            let set_result = store.set("tasks", "lost");
            let remove_result = store.remove("darkMode");

            // Assert
            assert!(set_result.is_err());
            assert!(remove_result.is_err());
            assert_eq!(store.get("tasks").unwrap(), None);
            assert_eq!(store.get("darkMode").unwrap().as_deref(), Some("false"));

            fs::remove_dir(dir.path().join("store.tmp")).unwrap();
            store.set("darkMode", "true").unwrap();
            let reopened = FileStore::open(&path).unwrap();
            assert_eq!(reopened.keys().unwrap(), vec!["darkMode".to_string()]);
        }
    }
}
