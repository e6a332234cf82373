//! Single-file JSON key-value store.
//!
//! The separate widget engine reads a flat `{ key: value }` JSON object from
//! shared local storage. Writes replace the whole file atomically (temp file
//! in the same directory, then rename) so the widget never sees a torn file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::KeyValueStore;
use crate::error::SyncError;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write within this process.
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

    fn read_all(&self) -> Result<BTreeMap<String, String>, SyncError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Like `read_all`, but a corrupt file is replaced rather than wedging every write.
    fn read_for_update(&self) -> Result<BTreeMap<String, String>, SyncError> {
        match self.read_all() {
            Err(SyncError::Serialization(e)) => {
                log::warn!(
                    "Shared store {} is corrupt ({}), starting fresh",
                    self.path.display(),
                    e
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), SyncError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| SyncError::from(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.read_for_update()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    /// Applied in memory, then written with a single atomic replace.
    fn set_many(&self, updates: &[(&str, Option<&str>)]) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.read_for_update()?;
        for (key, value) in updates {
            match value {
                Some(value) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                None => {
                    entries.remove(*key);
                }
            }
        }
        self.write_all(&entries)
    }
}
