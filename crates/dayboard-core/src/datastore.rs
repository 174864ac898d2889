use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::store::Snapshot;
use crate::task::Task;

pub const DEFAULT_STORAGE_KEY: &str = "dayboard.tasks";

/// Byte-oriented key-value storage the board persists into.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), bytes.into());
        store
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// One file per key inside a data directory. Writes are atomic.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key);
        debug!(file = %path.display(), "reading key");
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()))]
    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        debug!(file = %path.display(), "writing key atomically");

        let write_err = |source: std::io::Error| PersistenceError::Write {
            key: key.to_string(),
            source,
        };
        let mut temp = NamedTempFile::new_in(&self.data_dir).map_err(write_err)?;
        temp.write_all(bytes).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&path).map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// Moves whole snapshots in and out of a [`KvStore`] under a single key.
/// Storage problems are logged and never reach the caller.
#[derive(Debug)]
pub struct PersistenceBridge<S> {
    store: S,
    key: String,
}

impl<S: KvStore> PersistenceBridge<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Restores the stored snapshot, or an empty one when nothing usable is stored.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub fn load(&self) -> Snapshot {
        match self.try_load() {
            Ok(snapshot) => {
                debug!(count = snapshot.len(), "loaded tasks");
                snapshot
            }
            Err(err) => {
                warn!(error = %err, "discarding unreadable task data; starting empty");
                Snapshot::empty()
            }
        }
    }

    /// Writes the snapshot. Returns whether the write went through.
    #[tracing::instrument(skip(self, snapshot), fields(key = %self.key, count = snapshot.len()))]
    pub fn save(&mut self, snapshot: &Snapshot) -> bool {
        match self.try_save(snapshot) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to persist tasks; keeping in-memory state");
                false
            }
        }
    }

    pub fn try_load(&self) -> Result<Snapshot, PersistenceError> {
        let Some(bytes) = self.store.get(&self.key)? else {
            return Ok(Snapshot::empty());
        };
        decode_tasks(&bytes).map(Snapshot::from_tasks)
    }

    pub fn try_save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let bytes = encode_tasks(snapshot.tasks())?;
        self.store.set(&self.key, &bytes)
    }
}

pub fn encode_tasks(tasks: &[Task]) -> Result<Vec<u8>, PersistenceError> {
    serde_json::to_vec(tasks).map_err(PersistenceError::Encode)
}

/// Parses a stored array. Records that fail to parse, normalize to an empty
/// title, or repeat an earlier id are skipped.
pub fn decode_tasks(bytes: &[u8]) -> Result<Vec<Task>, PersistenceError> {
    let value: Value = serde_json::from_slice(bytes).map_err(PersistenceError::Decode)?;
    let Value::Array(items) = value else {
        return Err(PersistenceError::NotAnArray);
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let task = match serde_json::from_value::<Task>(item) {
            Ok(task) => task,
            Err(err) => {
                warn!(index = idx, error = %err, "skipping malformed task record");
                continue;
            }
        };
        let Some(task) = task.normalized() else {
            warn!(index = idx, "skipping task record with empty title");
            continue;
        };
        if !seen.insert(task.id.clone()) {
            warn!(index = idx, id = %task.id, "skipping duplicate task id");
            continue;
        }
        out.push(task);
    }
    Ok(out)
}
