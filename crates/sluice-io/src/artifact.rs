//! Run-scoped artifact store.
//!
//! Every run owns the namespace `<run_id>/`. Within it each artifact name is
//! written at most once; a second write of the same name is rejected. Runs
//! never read each other's namespaces.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sluice_core::hash::hash_serde;
use sluice_core::id::RunId;
use sluice_core::manifest::RunManifest;
use sluice_core::types::RowBatch;

use crate::error::{Error, Result};
use crate::storage::{join_key, Storage};

const MANIFEST_KEY: &str = "_manifest.json";

/// Size and content digest of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub name: String,
    pub rows: u64,
    pub digest: String,
}

#[derive(Serialize, Deserialize)]
struct StoredArtifact {
    name: String,
    run_id: RunId,
    rows: u64,
    digest: String,
    batch: RowBatch,
}

#[derive(Clone)]
pub struct ArtifactStore {
    storage: Arc<dyn Storage>,
}

impl ArtifactStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn key(run_id: &RunId, name: &str) -> Result<String> {
        if name.is_empty() || name.starts_with('_') || name.contains('/') || name.contains("..") {
            return Err(Error::Storage(format!("invalid artifact name '{name}'")));
        }
        Ok(join_key(&[run_id.as_str(), &format!("{name}.json")]))
    }

    fn run_prefix(run_id: &RunId) -> String {
        format!("{}/", run_id.as_str())
    }

    /// Persist `batch` as `name` for `run_id`. Visible atomically; fails if present.
    pub fn put(&self, run_id: &RunId, name: &str, batch: &RowBatch) -> Result<ArtifactMeta> {
        let key = Self::key(run_id, name)?;
        if self.storage.exists(&key)? {
            return Err(Error::ArtifactExists {
                run_id: run_id.to_string(),
                name: name.to_string(),
            });
        }
        batch.validate()?;
        let digest = hash_serde(batch)?.to_hex();
        let stored = StoredArtifact {
            name: name.to_string(),
            run_id: run_id.clone(),
            rows: batch.num_rows() as u64,
            digest: digest.clone(),
            batch: batch.clone(),
        };
        let bytes = serde_json::to_vec(&stored)?;
        self.storage.write(&key, &bytes)?;
        tracing::debug!(run_id = %run_id, artifact = name, rows = stored.rows, "artifact written");
        Ok(ArtifactMeta {
            name: name.to_string(),
            rows: stored.rows,
            digest,
        })
    }

    /// Load `name` for `run_id`, verifying its digest.
    pub fn get(&self, run_id: &RunId, name: &str) -> Result<RowBatch> {
        let key = Self::key(run_id, name)?;
        let bytes = self.storage.read(&key)?;
        let stored: StoredArtifact = serde_json::from_slice(&bytes).map_err(|e| Error::Corrupt {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let digest = hash_serde(&stored.batch)?.to_hex();
        if digest != stored.digest || &stored.run_id != run_id || stored.name != name {
            return Err(Error::Corrupt {
                name: name.to_string(),
                reason: "digest or identity mismatch".into(),
            });
        }
        Ok(stored.batch)
    }

    pub fn contains(&self, run_id: &RunId, name: &str) -> Result<bool> {
        self.storage.exists(&Self::key(run_id, name)?)
    }

    /// Artifact names present for `run_id`, sorted.
    pub fn list(&self, run_id: &RunId) -> Result<Vec<String>> {
        let prefix = Self::run_prefix(run_id);
        Ok(self
            .storage
            .list(&prefix)?
            .into_iter()
            .filter_map(|k| {
                k.strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_suffix(".json"))
                    .filter(|n| !n.starts_with('_') && !n.contains('/'))
                    .map(str::to_string)
            })
            .collect())
    }

    /// Drop every artifact (and the manifest) of `run_id`.
    pub fn purge_run(&self, run_id: &RunId) -> Result<()> {
        self.storage.delete_prefix(&Self::run_prefix(run_id))?;
        tracing::debug!(run_id = %run_id, "run namespace purged");
        Ok(())
    }

    pub fn put_manifest(&self, manifest: &RunManifest) -> Result<()> {
        let key = join_key(&[manifest.run_id.as_str(), MANIFEST_KEY]);
        let bytes = serde_json::to_vec_pretty(manifest)?;
        self.storage.write(&key, &bytes)
    }

    pub fn get_manifest(&self, run_id: &RunId) -> Result<RunManifest> {
        let key = join_key(&[run_id.as_str(), MANIFEST_KEY]);
        let bytes = self.storage.read(&key)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
