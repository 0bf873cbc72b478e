use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{check_namespace, document_id, Document, DocumentSink, InsertSummary};
use crate::error::Result;

#[derive(Default)]
struct Collection {
    ids: HashSet<String>,
    docs: Vec<Document>,
}

type Namespaces = BTreeMap<(String, String), Collection>;

/// In-process sink. A batch is applied under one lock, so it lands whole or not at all.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Namespaces>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Namespaces> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of `database.collection` in insertion order.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.inner()
            .get(&(database.to_string(), collection.to_string()))
            .map(|c| c.docs.clone())
            .unwrap_or_default()
    }
}

impl DocumentSink for MemorySink {
    fn insert_many(
        &self,
        database: &str,
        collection: &str,
        docs: &[Document],
    ) -> Result<InsertSummary> {
        check_namespace(database, collection)?;
        let ids = docs.iter().map(document_id).collect::<Result<Vec<_>>>()?;

        let mut inner = self.inner();
        let coll = inner
            .entry((database.to_string(), collection.to_string()))
            .or_default();
        let mut summary = InsertSummary::default();
        for (doc, id) in docs.iter().zip(ids) {
            if coll.ids.insert(id.to_string()) {
                coll.docs.push(doc.clone());
                summary.inserted += 1;
            } else {
                summary.duplicates += 1;
            }
        }
        Ok(summary)
    }

    fn count(&self, database: &str, collection: &str) -> Result<u64> {
        check_namespace(database, collection)?;
        Ok(self
            .inner()
            .get(&(database.to_string(), collection.to_string()))
            .map(|c| c.docs.len() as u64)
            .unwrap_or(0))
    }
}
