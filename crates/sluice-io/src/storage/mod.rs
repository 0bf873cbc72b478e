//! Storage adapters behind the `Storage` trait.
//!
//! - `fs`: local filesystem rooted at a directory (default).
//! - `MemoryStorage` (crate root): in-process map, for tests and dry runs.
//!
//! Keys are `/`-separated relative paths. `build_storage` picks a backend from
//! a URI (`file:///data`, `memory://`, or a bare path).

mod fs;
pub use fs::FsStorage;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::memory_storage::MemoryStorage;

/// Abstract byte store used for source files and run artifacts.
pub trait Storage: Send + Sync {
    /// Write bytes under `key`. The new content becomes visible all at once.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Read the full content of `key`.
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Whether `key` currently exists.
    fn exists(&self, key: &str) -> Result<bool>;

    /// Delete `key`. Idempotent (no error if it doesn't exist).
    fn delete(&self, key: &str) -> Result<()>;

    /// List keys under a prefix, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete every key under `prefix`. Idempotent.
    fn delete_prefix(&self, prefix: &str) -> Result<()> {
        for key in self.list(prefix)? {
            self.delete(&key)?;
        }
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(key, bytes)
    }
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        (**self).read(key)
    }
    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix)
    }
    fn delete_prefix(&self, prefix: &str) -> Result<()> {
        (**self).delete_prefix(prefix)
    }
}

/// Build the correct storage backend for `uri`.
pub fn build_storage(uri: &str) -> Result<Arc<dyn Storage>> {
    match uri.split_once("://").map(|(scheme, rest)| (scheme.trim(), rest)) {
        Some(("memory", _)) => Ok(Arc::new(MemoryStorage::new())),
        Some(("file", rest)) => {
            let path = if rest.starts_with('/') {
                rest.to_string()
            } else {
                format!("/{rest}")
            };
            Ok(Arc::new(FsStorage::new(path)))
        }
        Some((other, _)) => Err(Error::Storage(format!("unsupported storage scheme '{other}'"))),
        None => Ok(Arc::new(FsStorage::new(uri))),
    }
}

/// Join key segments with `/`, skipping empty ones.
pub fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
