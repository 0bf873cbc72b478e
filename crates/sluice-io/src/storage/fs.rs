use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use super::Storage;
use crate::error::{Error, Result};

const TMP_MARKER: &str = ".tmp-";

/// Local filesystem storage rooted at a directory.
///
/// Writes go to a sibling temp file which is then renamed into place, so a
/// reader sees either the old content, nothing, or the complete new content.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::Storage(format!("key '{key}' escapes the storage root")));
        }
        Ok(self.root.join(rel))
    }
}

impl Storage for FsStorage {
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let p = self.resolve(key)?;
        let parent = p
            .parent()
            .ok_or_else(|| Error::Storage(format!("key '{key}' has no parent")))?;
        fs::create_dir_all(parent).map_err(|e| Error::Storage(format!("mkparent: {e}")))?;

        let file_name = p
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Storage(format!("key '{key}' has no file name")))?;
        let tmp = parent.join(format!("{file_name}{TMP_MARKER}{}", Uuid::new_v4()));

        let result = (|| -> Result<()> {
            let mut f = File::create(&tmp).map_err(|e| Error::Storage(format!("create: {e}")))?;
            f.write_all(bytes)
                .map_err(|e| Error::Storage(format!("write: {e}")))?;
            f.sync_all()
                .map_err(|e| Error::Storage(format!("sync: {e}")))?;
            fs::rename(&tmp, &p).map_err(|e| Error::Storage(format!("rename: {e}")))?;
            Ok(())
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let p = self.resolve(key)?;
        match fs::read(&p) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(key.into())),
            Err(e) => Err(Error::Storage(format!("read: {e}"))),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.resolve(key)?.is_file())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let p = self.resolve(key)?;
        if p.exists() {
            fs::remove_file(&p).map_err(|e| Error::Storage(format!("delete: {e}")))?;
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut results = Vec::new();
        if !self.root.exists() {
            return Ok(results);
        }

        fn visit_dirs(root: &Path, dir: &Path, results: &mut Vec<String>) -> std::io::Result<()> {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    visit_dirs(root, &path, results)?;
                } else if let Ok(rel) = path.strip_prefix(root) {
                    let key = rel
                        .components()
                        .filter_map(|c| c.as_os_str().to_str())
                        .collect::<Vec<_>>()
                        .join("/");
                    if !key.contains(TMP_MARKER) {
                        results.push(key);
                    }
                }
            }
            Ok(())
        }

        visit_dirs(&self.root, &self.root, &mut results)
            .map_err(|e| Error::Storage(format!("list: {e}")))?;

        results.retain(|k| k.starts_with(prefix));
        results.sort();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("sluice-fs-tests-{name}-{}", Uuid::new_v4()));
        dir
    }

    #[test]
    fn write_read_list_delete() {
        let root = temp_root("basic");
        let storage = FsStorage::new(&root);

        storage.write("run-1/a.json", b"one").unwrap();
        storage.write("run-1/b.json", b"two").unwrap();
        storage.write("run-2/a.json", b"three").unwrap();

        assert_eq!(storage.read("run-1/a.json").unwrap(), b"one");
        assert_eq!(
            storage.list("run-1/").unwrap(),
            vec!["run-1/a.json".to_string(), "run-1/b.json".to_string()]
        );

        storage.delete_prefix("run-1/").unwrap();
        assert!(!storage.exists("run-1/a.json").unwrap());
        assert!(storage.exists("run-2/a.json").unwrap());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn overwrite_replaces_whole_content_and_leaves_no_temp_files() {
        let root = temp_root("atomic");
        let storage = FsStorage::new(&root);
        storage.write("x", b"a much longer first value").unwrap();
        storage.write("x", b"short").unwrap();
        assert_eq!(storage.read("x").unwrap(), b"short");
        assert_eq!(storage.list("").unwrap(), vec!["x".to_string()]);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_keys_report_not_found_and_parent_refs_are_refused() {
        let storage = FsStorage::new(temp_root("missing"));
        assert!(matches!(storage.read("nope"), Err(Error::NotFound(_))));
        assert!(storage.write("../escape", b"x").is_err());
    }
}
