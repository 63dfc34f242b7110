//! Persistent key-value area.
//!
//! A small string map that survives restarts on the local machine and is not
//! shared across devices. It holds the optimistic admin hint and the identity
//! provider's session token. Calls are synchronous; values are tiny.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Errors from a key-value backend.
#[derive(Debug, Error)]
pub enum KeyValueError {
    #[error("key-value file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("key-value file is not a JSON string map: {0}")]
    Format(#[from] serde_json::Error),
}

/// Local persistent string storage.
pub trait KeyValueArea: Send + Sync {
    /// Read a value; unreadable storage reads as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value.
    ///
    /// # Errors
    ///
    /// Returns `KeyValueError` if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueError>;

    /// Remove a value; absent keys are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `KeyValueError` if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), KeyValueError>;
}

/// Process-lifetime key-value area.
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueArea for MemoryKeyValue {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueError> {
        self.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KeyValueError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Key-value area stored as a JSON object in a single file.
///
/// The file is re-read on every call so separate processes sharing the file
/// see each other's writes. Writes go to a sibling temp file first and are
/// renamed into place.
#[derive(Debug)]
pub struct FileKeyValue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValue {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, KeyValueError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, values: &BTreeMap<String, String>) -> Result<(), KeyValueError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), KeyValueError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load()?;
        change(&mut values);
        self.store(&values)
    }
}

impl KeyValueArea for FileKeyValue {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable key-value file");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueError> {
        self.modify(|values| {
            values.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), KeyValueError> {
        self.modify(|values| {
            values.remove(key);
        })
    }
}
