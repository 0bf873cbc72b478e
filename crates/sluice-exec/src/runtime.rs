//! Runtime: execute a `PipelineDefinition`'s stages in dependency order.
//!
//! Behavior:
//! - Walks `PipelineDefinition.order` sequentially.
//! - A stage runs only when every input artifact is ready for the run.
//! - A failed stage writes nothing; everything downstream of it is skipped,
//!   unrelated stages still run.
//! - Outputs are written through the `ArtifactStore`, which makes each one
//!   visible all at once.

use std::collections::HashMap;
use std::time::Instant;

use sluice_core::id::RunId;
use sluice_core::manifest::{StageOutcome, StageStatus};
use sluice_core::types::RowBatch;
use sluice_io::ArtifactStore;
use sluice_planner::PipelineDefinition;

use crate::cancel::CancelToken;
use crate::metrics::emit_span;

/// Result of driving the stages of one run.
#[derive(Debug, Clone)]
pub struct StageRun {
    /// One outcome per stage: executed stages in execution order, followed
    /// by stages left `Pending` if the run was cancelled.
    pub outcomes: Vec<StageOutcome>,
    pub cancelled: bool,
}

impl StageRun {
    /// First failed stage in execution order, with its cause.
    pub fn first_failure(&self) -> Option<(&str, &str)> {
        self.outcomes.iter().find_map(|o| match &o.status {
            StageStatus::Failed { cause } => Some((o.stage.as_str(), cause.as_str())),
            _ => None,
        })
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.outcomes.iter().all(|o| o.status.is_succeeded())
    }
}

/// Engine owns the artifact store the stages read from and write to.
pub struct Engine {
    artifacts: ArtifactStore,
}

impl Engine {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }

    /// Run every stage of `def` for `run_id`. The source artifact must already
    /// be in the store. Cancellation is checked between stages.
    pub fn run_stages(
        &self,
        def: &PipelineDefinition,
        run_id: &RunId,
        cancel: &CancelToken,
    ) -> StageRun {
        let spec = &def.spec;
        // artifact name -> Ok(()) when ready, Err(root failed stage) otherwise
        let mut ready: HashMap<&str, Result<(), String>> = HashMap::new();
        ready.insert(spec.source.artifact.as_str(), Ok(()));

        let mut outcomes = Vec::with_capacity(def.order.len());
        let mut cancelled = false;

        for id in &def.order {
            let (Some(stage), Some(binding)) = (spec.stage(*id), def.binding(*id)) else {
                continue;
            };
            if cancel.is_cancelled() {
                cancelled = true;
                outcomes.push(StageOutcome {
                    stage: stage.name.clone(),
                    output: stage.output.clone(),
                    status: StageStatus::Pending,
                    elapsed_ms: 0,
                });
                continue;
            }

            let blocked = stage.inputs.iter().find_map(|input| match ready.get(input.as_str()) {
                Some(Ok(())) => None,
                Some(Err(root)) => Some(root.clone()),
                None => Some(input.clone()),
            });
            if let Some(because) = blocked {
                tracing::warn!(run_id = %run_id, stage = %stage.name, because = %because, "stage skipped");
                ready.insert(stage.output.as_str(), Err(because.clone()));
                outcomes.push(StageOutcome {
                    stage: stage.name.clone(),
                    output: stage.output.clone(),
                    status: StageStatus::Skipped { because },
                    elapsed_ms: 0,
                });
                continue;
            }

            let started = Instant::now();
            let status = match self.execute(run_id, &stage.inputs, &stage.output, binding.transform.as_ref()) {
                Ok((rows, digest)) => {
                    tracing::info!(run_id = %run_id, stage = %stage.name, rows, "stage succeeded");
                    ready.insert(stage.output.as_str(), Ok(()));
                    StageStatus::Succeeded { rows, digest }
                }
                Err(cause) => {
                    tracing::warn!(run_id = %run_id, stage = %stage.name, cause = %cause, "stage failed");
                    ready.insert(stage.output.as_str(), Err(stage.name.clone()));
                    StageStatus::Failed { cause }
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;
            emit_span(
                "stage",
                &[
                    ("run_id", run_id.to_string()),
                    ("stage", stage.name.clone()),
                    ("op", binding.key.clone()),
                    ("elapsed_ms", elapsed_ms.to_string()),
                ],
            );
            outcomes.push(StageOutcome {
                stage: stage.name.clone(),
                output: stage.output.clone(),
                status,
                elapsed_ms,
            });
        }

        StageRun {
            outcomes,
            cancelled,
        }
    }

    fn execute(
        &self,
        run_id: &RunId,
        inputs: &[String],
        output: &str,
        transform: &dyn sluice_operators::Transform,
    ) -> Result<(u64, String), String> {
        let batches: Vec<RowBatch> = inputs
            .iter()
            .map(|name| self.artifacts.get(run_id, name))
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?;

        let input_columns: Vec<Vec<String>> = batches
            .iter()
            .map(|b| b.column_names().iter().map(|s| s.to_string()).collect())
            .collect();
        let planned = transform.plan(&input_columns).map_err(|e| e.to_string())?;

        let out = transform.apply(&batches).map_err(|e| e.to_string())?;
        let produced: Vec<&str> = out.column_names();
        if produced != planned.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(format!(
                "{} produced columns {:?}, planned {:?}",
                transform.name(),
                produced,
                planned
            ));
        }

        let meta = self
            .artifacts
            .put(run_id, output, &out)
            .map_err(|e| e.to_string())?;
        Ok((meta.rows, meta.digest))
    }
}
