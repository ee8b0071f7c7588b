//! Key-value slots backing the fallback store
//!
//! A deliberately tiny contract: string keys to string values, one slot per
//! record collection. Reads never fail loudly (a broken slot reads as
//! absent); writes surface a typed error so callers can warn the user
//! instead of silently losing data.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::storage::StorageError;

/// Flat string-keyed storage with single-slot-atomic writes
pub trait KeyValueBackend: Send + Sync {
    /// Read a slot. Missing and unreadable slots both come back as `None`;
    /// unreadable slots log a warning first.
    fn get(&self, key: &str) -> Option<String>;

    /// Replace a slot's contents
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a slot; absent slots are a no-op
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-per-slot backend under a single directory
#[derive(Debug)]
pub struct FileKeyValueBackend {
    dir: PathBuf,
}

impl FileKeyValueBackend {
    /// Create the backing directory if needed and return the backend
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| StorageError::WriteFailed(format!("cannot create {:?}: {}", dir, e)))?;
        Ok(Self { dir })
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueBackend for FileKeyValueBackend {
    fn get(&self, key: &str) -> Option<String> {
        match std::fs::read_to_string(self.slot_path(key)) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read key-value slot {:?}: {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Write to a sibling temp file and rename so a crash mid-write
        // cannot corrupt the slot
        let path = self.slot_path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| StorageError::WriteFailed(format!("slot {:?}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed(format!("slot {:?}: {}", key, e))),
        }
    }
}

/// In-memory backend
///
/// Used by tests and anywhere an ephemeral store is acceptable. The
/// read-only toggle simulates an exhausted quota so failure paths can be
/// exercised deterministically.
#[derive(Debug, Default)]
pub struct MemoryKeyValueBackend {
    slots: Mutex<HashMap<String, String>>,
    read_only: AtomicBool,
}

impl MemoryKeyValueBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full quota would
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl KeyValueBackend for MemoryKeyValueBackend {
    fn get(&self, key: &str) -> Option<String> {
        match self.slots.lock() {
            Ok(slots) => slots.get(key).cloned(),
            Err(_) => {
                tracing::warn!("Key-value map poisoned while reading {:?}", key);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("storage quota exceeded".to_string()));
        }
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::WriteFailed("key-value map poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("storage quota exceeded".to_string()));
        }
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::WriteFailed("key-value map poisoned".to_string()))?;
        slots.remove(key);
        Ok(())
    }
}
