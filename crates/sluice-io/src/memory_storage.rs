//! In-memory storage backend for testing.
//!
//! Provides a map-based storage that implements the Storage trait.
//! Used for `memory://` URIs and in tests to avoid file I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Thread-safe in-memory storage. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A panic while holding the lock cannot leave a half-written value:
        // every mutation is a single map operation.
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pre-populate data for a key (used by tests)
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.data().insert(key.into(), bytes);
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.data().contains_key(key)
    }

    /// Get the number of stored objects
    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Clear all stored data
    pub fn clear(&self) {
        self.data().clear();
    }
}

impl Storage for MemoryStorage {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.data().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.data()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.contains(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data().remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .data()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<()> {
        self.data().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}
