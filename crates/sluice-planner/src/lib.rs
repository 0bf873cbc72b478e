#![forbid(unsafe_code)]
//! sluice-planner: from (YAML) pipeline documents → validated `PipelineSpec`
//! → `PipelineDefinition` (stage order + bound transforms + plan hash).
//!
//! Design:
//! - The graph itself lives in `sluice-core::dag`; this crate adds:
//!     * the YAML DSL (`dsl::yaml`) with an optional `config:` block
//!     * the built-in pipeline (`builtin`)
//!     * binding of `op` keys to transforms (`physical`)
//!     * a human-readable plan dump (`explain`)

pub mod builtin;
pub mod dsl;
pub mod error;
pub mod explain;
pub mod physical;

pub use builtin::default_pipeline;
pub use dsl::yaml::{parse_yaml_pipeline, render_yaml_pipeline, ParsedPipeline, PipelineConfig};
pub use error::{PlanError, Result};
pub use explain::explain;
pub use physical::{bind, PipelineDefinition, StageBinding};
