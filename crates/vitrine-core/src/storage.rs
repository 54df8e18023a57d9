//! Key-value persistence for best-effort hint caches.
//!
//! A [`KeyValueStore`] holds opaque string values under string keys, the same
//! contract as browser local storage. [`FileStore`] keeps one file per key in
//! the data directory; [`MemoryStore`] keeps everything in process and is used
//! for caches that should not outlive the session, and in tests.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::debug;

/// Maximum allowed key length
const MAX_KEY_LEN: usize = 128;

/// String-keyed persistence used by the hint cache.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root_dir`, creating the directory if needed.
    pub fn new(root_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root_dir)
            .map_err(|e| Error::Storage(format!("Failed to create data directory: {e}")))?;
        Ok(Self { root_dir })
    }

    /// Returns the root data directory path
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Path of the file backing `key`.
    pub fn key_path(&self, key: &str) -> Result<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.root_dir.join(format!("{key}.json")))
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Storage("Storage key cannot be empty".into()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Error::Storage(format!(
                "Storage key '{key}' exceeds maximum length of {MAX_KEY_LEN} characters"
            )));
        }
        if key.starts_with('.') || key.contains("..") {
            return Err(Error::Storage(format!(
                "Storage key '{key}' cannot start with a dot or contain '..'"
            )));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(Error::Storage(format!(
                "Storage key '{key}' may only contain ASCII letters, digits, '.', '_' and '-'"
            )));
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::Storage(format!("Failed to read '{key}': {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;

        // One temp file per write; concurrent writers never share it.
        let mut tmp = NamedTempFile::new_in(&self.root_dir)
            .map_err(|e| Error::Storage(format!("Failed to write '{key}': {e}")))?;
        tmp.write_all(value.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::Storage(format!("Failed to write '{key}': {e}")))?;
        tmp.persist(&path)
            .map_err(|e| Error::Storage(format!("Failed to commit '{key}': {e}")))?;

        debug!("Saved {} bytes under {}", value.len(), key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("Failed to remove '{key}': {e}"))),
        }
    }
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
