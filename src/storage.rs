use crate::model::{ArchiveEntry, Task};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TASKS_KEY: &str = "snail_tasks_v1";
pub const HISTORY_KEY: &str = "snail_history_v1";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("writing {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable string blobs addressed by key.
///
/// `get` never fails: anything unreadable is reported as absent.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(data) => Some(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable store entry, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Write {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, value).map_err(|source| StoreError::Write { path, source })
    }
}

/// In-process store used by tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::cell::RefCell<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Result of reading a list blob.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredList<T> {
    /// Nothing stored under the key.
    Absent,
    /// Stored, but not JSON or not an array.
    Malformed,
    /// Every element that decoded; the rest were skipped.
    Items(Vec<T>),
}

impl<T> StoredList<T> {
    pub fn items(self) -> Option<Vec<T>> {
        match self {
            StoredList::Items(items) => Some(items),
            StoredList::Absent | StoredList::Malformed => None,
        }
    }
}

pub fn load_tasks(store: &dyn KeyValueStore) -> StoredList<Task> {
    read_json_list(store, TASKS_KEY)
}

/// Reads the archive and drops entries older than `ttl_ms` relative to
/// `now_ms`. The trimmed list is written back when anything was dropped.
pub fn load_history(store: &dyn KeyValueStore, now_ms: i64, ttl_ms: i64) -> Vec<ArchiveEntry> {
    let entries: Vec<ArchiveEntry> = read_json_list(store, HISTORY_KEY)
        .items()
        .unwrap_or_default();
    let before = entries.len();
    let kept = purge_expired(entries, now_ms, ttl_ms);
    if kept.len() != before {
        debug!(dropped = before - kept.len(), "purged expired history");
        if let Err(err) = save_history(store, &kept) {
            warn!(error = %err, "could not rewrite purged history");
        }
    }
    kept
}

pub fn purge_expired(entries: Vec<ArchiveEntry>, now_ms: i64, ttl_ms: i64) -> Vec<ArchiveEntry> {
    entries
        .into_iter()
        .filter(|entry| now_ms - entry.ts <= ttl_ms)
        .collect()
}

pub fn save_tasks(store: &dyn KeyValueStore, tasks: &[Task]) -> Result<(), StoreError> {
    write_json(store, TASKS_KEY, tasks)
}

pub fn save_history(store: &dyn KeyValueStore, history: &[ArchiveEntry]) -> Result<(), StoreError> {
    write_json(store, HISTORY_KEY, history)
}

/// Elements that fail to decode are skipped; only a non-array value is `Malformed`.
fn read_json_list<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StoredList<T> {
    let Some(raw) = store.get(key) else {
        return StoredList::Absent;
    };
    let elements = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
        Ok(elements) => elements,
        Err(err) => {
            warn!(key, error = %err, "stored value is not a JSON array, using default");
            return StoredList::Malformed;
        }
    };
    let items = elements
        .into_iter()
        .enumerate()
        .filter_map(|(idx, element)| match serde_json::from_value::<T>(element) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(key, index = idx, error = %err, "skipping unreadable stored record");
                None
            }
        })
        .collect();
    StoredList::Items(items)
}

fn write_json<T: serde::Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let serialized = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &serialized)
}

/// Picks the data directory: explicit override, then the platform data dir.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let dirs = ProjectDirs::from("", "", "snailtrack").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
