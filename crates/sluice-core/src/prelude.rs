//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::dag::{PipelineSpec, SinkSpec, SourceSpec, StageSpec};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{RunId, StageId};
pub use crate::manifest::{
    LoadSummary, ManifestId, RunManifest, RunState, StageOutcome, StageStatus,
};
pub use crate::types::{Column, RowBatch, Scalar};
