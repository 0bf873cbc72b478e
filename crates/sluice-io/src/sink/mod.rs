//! Document sinks.
//!
//! A sink stores JSON documents in named collections and treats the string
//! field `_id` as a unique key: documents whose `_id` is already present in
//! the collection (or earlier in the same batch) are counted as duplicates
//! and skipped, the rest are inserted.

mod jsonl;
mod memory;

pub use jsonl::JsonlSink;
pub use memory::MemorySink;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One record as handed to the sink.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field holding the dedup key of a document.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertSummary {
    pub inserted: u64,
    pub duplicates: u64,
}

impl InsertSummary {
    pub fn merge(self, other: InsertSummary) -> InsertSummary {
        InsertSummary {
            inserted: self.inserted + other.inserted,
            duplicates: self.duplicates + other.duplicates,
        }
    }
}

/// Bulk-insert target for loaded rows.
pub trait DocumentSink: Send + Sync {
    /// Insert `docs` into `database.collection`, skipping known `_id`s.
    fn insert_many(&self, database: &str, collection: &str, docs: &[Document])
        -> Result<InsertSummary>;

    /// Number of documents currently stored in `database.collection`.
    fn count(&self, database: &str, collection: &str) -> Result<u64>;
}

impl<S: DocumentSink + ?Sized> DocumentSink for std::sync::Arc<S> {
    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        docs: &[Document],
    ) -> Result<InsertSummary> {
        (**self).insert_many(database, collection, docs)
    }

    fn count(&self, database: &str, collection: &str) -> Result<u64> {
        (**self).count(database, collection)
    }
}

/// The `_id` of `doc`, which must be a string.
pub fn document_id(doc: &Document) -> Result<&str> {
    doc.get(ID_FIELD)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Sink(format!("document without a string '{}' field", ID_FIELD)))
}

pub(crate) fn check_namespace(database: &str, collection: &str) -> Result<()> {
    for part in [database, collection] {
        if part.is_empty() || part.contains('/') || part.contains('\\') || part.starts_with('.') {
            return Err(Error::Sink(format!("invalid namespace '{database}.{collection}'")));
        }
    }
    Ok(())
}
