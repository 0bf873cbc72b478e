use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{check_namespace, document_id, Document, DocumentSink, InsertSummary, ID_FIELD};
use crate::error::{Error, Result};
use crate::writers::JsonlWriter;

/// File-backed sink: one NDJSON file per collection at `<root>/<database>/<collection>.jsonl`.
///
/// Documents are appended line by line, so an interrupted batch may leave a
/// prefix on disk. Retrying the batch only appends what is missing.
pub struct JsonlSink {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, database: &str, collection: &str) -> Result<PathBuf> {
        check_namespace(database, collection)?;
        Ok(self.root.join(database).join(format!("{collection}.jsonl")))
    }

    /// Every document stored in `database.collection`, in file order.
    pub fn documents(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let path = self.path(database, collection)?;
        read_documents(&path)
    }
}

fn read_documents(path: &Path) -> Result<Vec<Document>> {
    Ok(load(path)?.0)
}

/// Parsed documents plus whether the file ends in an unterminated line.
fn load(path: &Path) -> Result<(Vec<Document>, bool)> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), false)),
        Err(e) => return Err(e.into()),
    };
    let mut docs = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        // A torn line from an interrupted append is ignored.
        match serde_json::from_str::<Document>(line) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = lineno + 1, error = %e, "skipping unreadable sink line")
            }
        }
    }
    let unterminated = !raw.is_empty() && !raw.ends_with('\n');
    Ok((docs, unterminated))
}

impl DocumentSink for JsonlSink {
    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        docs: &[Document],
    ) -> Result<InsertSummary> {
        let path = self.path(database, collection)?;
        let ids = docs.iter().map(document_id).collect::<Result<Vec<_>>>()?;

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let (existing, unterminated) = load(&path)?;
        let mut known: HashSet<String> = existing
            .iter()
            .filter_map(|d| d.get(ID_FIELD).and_then(|v| v.as_str()).map(str::to_string))
            .collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        if unterminated {
            file.write_all(b"\n")?;
        }
        let mut writer = JsonlWriter::to_writer(file);
        let mut summary = InsertSummary::default();
        for (doc, id) in docs.iter().zip(ids) {
            if known.insert(id.to_string()) {
                writer.write_document(doc)?;
                summary.inserted += 1;
            } else {
                summary.duplicates += 1;
            }
        }
        let file = writer.finish()?;
        file.sync_all()
            .map_err(|e| Error::Sink(format!("sync {}: {e}", path.display())))?;
        Ok(summary)
    }

    fn count(&self, database: &str, collection: &str) -> Result<u64> {
        Ok(self.documents(database, collection)?.len() as u64)
    }
}
