//! YAML → PipelineSpec parser.
//!
//! Example:
//! ```yaml
//! name: reviews
//! source: { artifact: "reviews.csv" }
//! stages:
//!   - { name: fill, op: fill_nulls, output: filled }
//!   - { name: sort, op: temporal_sort, output: sorted }
//!   - name: clean
//!     op: sanitize_content
//!     inputs: [sorted]
//!     output: cleaned
//!     params: { column: "content" }
//! sink: { database: "reviews_db", collection: "reviews" }
//! config:
//!   poll_interval_ms: 5000
//! ```
//!
//! `inputs` may be omitted: the stage then reads the previous stage's output
//! (or the source artifact for the first stage). `output` defaults to the
//! stage name.

use serde::{Deserialize, Serialize};

use sluice_core::config::EngineConfig;
use sluice_core::dag::{PipelineSpec, SinkSpec, SourceSpec, StageSpec};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDoc {
    pub name: String,
    pub source: SourceSpec,
    pub stages: Vec<StageDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_artifact: Option<String>,
    pub sink: SinkSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDoc {
    pub name: String,
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

/// Engine settings a pipeline file may pin. Unset fields keep the
/// environment/default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub source_root: Option<String>,
    pub artifact_root: Option<String>,
    pub sink_root: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub gate_timeout_ms: Option<u64>,
    pub load_batch_size: Option<usize>,
    pub sentinel: Option<String>,
}

impl PipelineConfig {
    /// Overlay the set fields onto `cfg`.
    pub fn apply_to(&self, cfg: &mut EngineConfig) {
        if let Some(v) = &self.source_root {
            cfg.source_root = v.clone();
        }
        if let Some(v) = &self.artifact_root {
            cfg.artifact_root = v.clone();
        }
        if let Some(v) = &self.sink_root {
            cfg.sink_root = v.clone();
        }
        if let Some(v) = self.poll_interval_ms {
            cfg.poll_interval_ms = v;
        }
        if let Some(v) = self.gate_timeout_ms {
            cfg.gate_timeout_ms = Some(v);
        }
        if let Some(v) = self.load_batch_size {
            cfg.load_batch_size = Some(v).filter(|v| *v > 0);
        }
        if let Some(v) = &self.sentinel {
            cfg.sentinel = v.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedPipeline {
    pub spec: PipelineSpec,
    pub config: PipelineConfig,
}

impl PipelineDoc {
    fn into_spec(self) -> (PipelineSpec, PipelineConfig) {
        let mut prev = self.source.artifact.clone();
        let stages = self
            .stages
            .into_iter()
            .map(|doc| {
                let output = doc.output.unwrap_or_else(|| doc.name.clone());
                let inputs = doc.inputs.unwrap_or_else(|| vec![prev.clone()]);
                prev = output.clone();
                StageSpec {
                    name: doc.name,
                    op: doc.op,
                    inputs,
                    output,
                    params: doc.params,
                }
            })
            .collect();
        let spec = PipelineSpec {
            name: self.name,
            source: self.source,
            stages,
            final_artifact: self.final_artifact,
            sink: self.sink,
        };
        (spec, self.config.unwrap_or_default())
    }

    fn from_spec(spec: &PipelineSpec, config: Option<PipelineConfig>) -> Self {
        PipelineDoc {
            name: spec.name.clone(),
            source: spec.source.clone(),
            stages: spec
                .stages
                .iter()
                .map(|s| StageDoc {
                    name: s.name.clone(),
                    op: s.op.clone(),
                    inputs: Some(s.inputs.clone()),
                    output: Some(s.output.clone()),
                    params: s.params.clone(),
                })
                .collect(),
            final_artifact: spec.final_artifact.clone(),
            sink: spec.sink.clone(),
            config,
        }
    }
}

/// Parse and validate a YAML pipeline document.
pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<ParsedPipeline> {
    let doc: PipelineDoc = serde_yaml::from_str(yaml_src)?;
    let (spec, config) = doc.into_spec();
    spec.validate()?;
    Ok(ParsedPipeline { spec, config })
}

/// Render `spec` back to the DSL with every input and output spelled out.
pub fn render_yaml_pipeline(spec: &PipelineSpec, config: Option<&PipelineConfig>) -> Result<String> {
    let doc = PipelineDoc::from_spec(spec, config.cloned());
    Ok(serde_yaml::to_string(&doc)?)
}
