//! Key-value persistence for extension state
//!
//! The registry and the explorer key live in one JSON object, keyed the way
//! the editor's global state keys them (`cardano.node`, `cardano.apiKey`).
//! Callers only see `get`/`set`, so tests can swap in [`MemoryStore`].

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Storage port: one whole value per key, read and written as a unit
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        (**self).set(key, value)
    }
}

/// State persisted as a single pretty-printed JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries. A missing file is empty; so is a corrupt one.
    fn load(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("state file {:?} not found, starting empty", self.path);
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(e).context(format!("failed to read state file: {:?}", self.path));
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    "state file {:?} is not a JSON object, treating it as empty: {e}",
                    self.path
                );
                Ok(Map::new())
            }
        }
    }

    /// Write all entries via temp file + rename so readers never see a partial file
    fn save(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("failed to create state directory: {parent:?}"))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path)
            .context(format!("failed to create temp state file: {temp_path:?}"))?;

        serde_json::to_writer_pretty(&file, entries)
            .context(format!("failed to serialize state: {temp_path:?}"))?;
        file.sync_all().context("failed to sync state file")?;

        fs::rename(&temp_path, &self.path)
            .context(format!("failed to replace state file: {:?}", self.path))
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("state file lock poisoned"))?;

        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.save(&entries)
    }
}

/// In-memory store, used by tests and as a scratch store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
