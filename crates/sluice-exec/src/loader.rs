//! Loader: final artifact → sink documents.
//!
//! Each row becomes one document keyed by `_id`, a digest of the run id, the
//! row's position and its content. The same run always yields the same keys,
//! so a repeated load only inserts what the sink does not have yet.

use std::sync::Arc;

use sluice_core::dag::SinkSpec;
use sluice_core::hash::row_key;
use sluice_core::id::RunId;
use sluice_core::manifest::LoadSummary;
use sluice_core::types::RowBatch;
use sluice_io::sink::ID_FIELD;
use sluice_io::{ArtifactStore, Document, DocumentSink, Error, InsertSummary};

use crate::metrics::emit_span;

pub struct Loader {
    sink: Arc<dyn DocumentSink>,
    batch_size: Option<usize>,
}

/// Convert `batch` into keyed documents, in row order.
pub fn to_documents(run_id: &RunId, batch: &RowBatch) -> sluice_io::Result<Vec<Document>> {
    if batch.column_index(ID_FIELD).is_some() {
        return Err(Error::Sink(format!("column '{ID_FIELD}' is reserved for the dedup key")));
    }
    let mut docs = Vec::with_capacity(batch.num_rows());
    for idx in 0..batch.num_rows() {
        let Some(row) = batch.row(idx) else { break };
        let mut doc = Document::new();
        for (name, value) in row {
            doc.insert(name.to_string(), value.to_json());
        }
        // Map keys are sorted, so this encoding is canonical.
        let canonical = serde_json::to_vec(&doc)?;
        let key = row_key(run_id, idx as u64, &canonical);
        doc.insert(ID_FIELD.to_string(), serde_json::Value::String(key.to_hex()));
        docs.push(doc);
    }
    Ok(docs)
}

impl Loader {
    pub fn new(sink: Arc<dyn DocumentSink>, batch_size: Option<usize>) -> Self {
        Self {
            sink,
            batch_size: batch_size.filter(|n| *n > 0),
        }
    }

    /// Read `final_artifact` of `run_id` and insert it into `target`.
    ///
    /// An empty artifact makes no sink call. Errors are returned as-is; the
    /// loader never retries.
    pub fn load(
        &self,
        artifacts: &ArtifactStore,
        run_id: &RunId,
        final_artifact: &str,
        target: &SinkSpec,
    ) -> sluice_io::Result<LoadSummary> {
        let batch = artifacts.get(run_id, final_artifact)?;
        let docs = to_documents(run_id, &batch)?;

        let mut summary = InsertSummary::default();
        if !docs.is_empty() {
            let chunk = self.batch_size.unwrap_or(docs.len());
            for part in docs.chunks(chunk) {
                let s = self
                    .sink
                    .insert_many(&target.database, &target.collection, part)?;
                summary = summary.merge(s);
            }
        }

        tracing::info!(
            run_id = %run_id,
            collection = %format!("{}.{}", target.database, target.collection),
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            "load complete"
        );
        emit_span(
            "load",
            &[
                ("run_id", run_id.to_string()),
                ("inserted", summary.inserted.to_string()),
                ("duplicates", summary.duplicates.to_string()),
            ],
        );
        Ok(LoadSummary {
            inserted: summary.inserted,
            duplicates: summary.duplicates,
        })
    }
}
