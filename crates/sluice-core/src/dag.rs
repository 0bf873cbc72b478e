//! Declarative pipeline graph.
//!
//! A `PipelineSpec` names a source artifact, a list of stages wired together by
//! artifact names, and a sink. It is pure data: the exec crate binds each
//! stage's `op` key to a concrete transform and drives the run.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::StageId;

/// The raw input artifact the arrival gate waits for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Artifact name; also the file name under the source root.
    pub artifact: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    /// Transform key resolved by the operator registry (e.g. `fill_nulls`).
    pub op: String,
    /// Input artifact names, in the order the transform receives them.
    pub inputs: Vec<String>,
    pub output: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkSpec {
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Pipeline identity; single-flight is enforced per name.
    pub name: String,
    pub source: SourceSpec,
    pub stages: Vec<StageSpec>,
    /// Artifact handed to the loader. Defaults to the last declared stage's output.
    #[serde(default)]
    pub final_artifact: Option<String>,
    pub sink: SinkSpec,
}

impl PipelineSpec {
    /// Artifact the loader reads.
    pub fn final_artifact(&self) -> Option<&str> {
        self.final_artifact
            .as_deref()
            .or_else(|| self.stages.last().map(|s| s.output.as_str()))
    }

    pub fn stage(&self, id: StageId) -> Option<&StageSpec> {
        self.stages.get(id.get() as usize)
    }

    /// Check the graph: unique names and outputs, resolvable inputs, a known
    /// final artifact. Cycles are detected by `execution_order`.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Pipeline("pipeline name must not be empty".into()));
        }
        if self.source.artifact.trim().is_empty() {
            return Err(Error::Pipeline("source artifact must not be empty".into()));
        }
        if self.stages.is_empty() {
            return Err(Error::Pipeline("pipeline has no stages".into()));
        }

        let mut names = HashSet::new();
        let mut outputs = HashSet::new();
        for stage in &self.stages {
            if !names.insert(stage.name.as_str()) {
                return Err(Error::Pipeline(format!("duplicate stage name '{}'", stage.name)));
            }
            if stage.output == self.source.artifact {
                return Err(Error::Pipeline(format!(
                    "stage '{}' overwrites the source artifact '{}'",
                    stage.name, stage.output
                )));
            }
            if !outputs.insert(stage.output.as_str()) {
                return Err(Error::Pipeline(format!(
                    "artifact '{}' is produced by more than one stage",
                    stage.output
                )));
            }
            if stage.inputs.is_empty() {
                return Err(Error::Pipeline(format!("stage '{}' has no inputs", stage.name)));
            }
        }

        for stage in &self.stages {
            for input in &stage.inputs {
                if input != &self.source.artifact && !outputs.contains(input.as_str()) {
                    return Err(Error::Pipeline(format!(
                        "stage '{}' reads '{}', which nothing produces",
                        stage.name, input
                    )));
                }
            }
        }

        match self.final_artifact() {
            Some(name) if outputs.contains(name) => {}
            Some(name) => {
                return Err(Error::Pipeline(format!(
                    "final artifact '{name}' is not produced by any stage"
                )))
            }
            None => return Err(Error::Pipeline("no final artifact".into())),
        }

        self.execution_order().map(|_| ())
    }

    /// Topological order of stages (Kahn). Among ready stages the lowest
    /// declaration index runs first, so the order is reproducible.
    pub fn execution_order(&self) -> Result<Vec<StageId>> {
        let producers: HashMap<&str, usize> = self
            .stages
            .iter()
            .enumerate()
            .map(|(i, s)| (s.output.as_str(), i))
            .collect();

        let mut pending = vec![0usize; self.stages.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.stages.len()];
        for (i, stage) in self.stages.iter().enumerate() {
            let upstream: BTreeSet<usize> = stage
                .inputs
                .iter()
                .filter_map(|input| producers.get(input.as_str()).copied())
                .collect();
            pending[i] = upstream.len();
            for up in upstream {
                dependents[up].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = (0..self.stages.len()).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(self.stages.len());
        while let Some(next) = ready.pop_first() {
            order.push(StageId::new(next as u64));
            for &down in &dependents[next] {
                pending[down] -= 1;
                if pending[down] == 0 {
                    ready.insert(down);
                }
            }
        }

        if order.len() != self.stages.len() {
            let stuck: Vec<&str> = (0..self.stages.len())
                .filter(|&i| pending[i] > 0)
                .map(|i| self.stages[i].name.as_str())
                .collect();
            return Err(Error::Pipeline(format!(
                "dependency cycle between stages: {}",
                stuck.join(", ")
            )));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str, inputs: &[&str], output: &str) -> StageSpec {
        StageSpec {
            name: name.into(),
            op: "noop".into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.into(),
            params: serde_json::Value::Null,
        }
    }

    fn spec(stages: Vec<StageSpec>) -> PipelineSpec {
        PipelineSpec {
            name: "p".into(),
            source: SourceSpec {
                artifact: "raw".into(),
                delimiter: ',',
            },
            stages,
            final_artifact: None,
            sink: SinkSpec {
                database: "db".into(),
                collection: "c".into(),
            },
        }
    }

    fn names(p: &PipelineSpec, order: &[StageId]) -> Vec<String> {
        order
            .iter()
            .map(|id| p.stage(*id).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn linear_chain_runs_in_dependency_order_regardless_of_declaration() {
        let p = spec(vec![
            stage("clean", &["sorted"], "clean"),
            stage("fill", &["raw"], "filled"),
            stage("sort", &["filled"], "sorted"),
        ]);
        p.validate().unwrap();
        let order = p.execution_order().unwrap();
        assert_eq!(names(&p, &order), vec!["fill", "sort", "clean"]);
    }

    #[test]
    fn same_inputs_tie_break_by_declaration() {
        let p = spec(vec![
            stage("b", &["raw"], "b_out"),
            stage("a", &["raw"], "a_out"),
            stage("join", &["a_out", "b_out"], "joined"),
        ]);
        let order = p.execution_order().unwrap();
        assert_eq!(names(&p, &order), vec!["b", "a", "join"]);
    }

    #[test]
    fn cycles_are_rejected() {
        let p = spec(vec![
            stage("x", &["raw", "y_out"], "x_out"),
            stage("y", &["x_out"], "y_out"),
        ]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("dependency cycle"));
    }

    #[test]
    fn dangling_inputs_and_duplicate_outputs_are_rejected() {
        let dangling = spec(vec![stage("x", &["nowhere"], "x_out")]);
        assert!(dangling.validate().unwrap_err().to_string().contains("nothing produces"));

        let dup = spec(vec![stage("x", &["raw"], "out"), stage("y", &["raw"], "out")]);
        assert!(dup.validate().unwrap_err().to_string().contains("more than one stage"));

        let clobber = spec(vec![stage("x", &["raw"], "raw")]);
        assert!(clobber.validate().unwrap_err().to_string().contains("overwrites"));
    }

    #[test]
    fn final_artifact_defaults_to_last_stage_and_must_exist() {
        let mut p = spec(vec![stage("x", &["raw"], "x_out")]);
        assert_eq!(p.final_artifact(), Some("x_out"));
        p.final_artifact = Some("ghost".into());
        assert!(p.validate().is_err());
    }
}
