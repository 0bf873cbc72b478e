//! Run lifecycle states and the manifest emitted when a run terminates.
//!
//! The manifest is the audit record of one run: which stages ran, what they
//! produced, and what reached the sink.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::hash::Hash256;
use crate::id::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

/// Pipeline run state machine.
///
/// `Waiting -> Running -> Loading -> Succeeded`, with `Failed`, `TimedOut`
/// and `Cancelled` as the other terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Waiting,
    Running,
    Loading,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::TimedOut | RunState::Cancelled
        )
    }

    /// Validate a transition and return the next state.
    pub fn transition(self, next: RunState) -> Result<RunState> {
        use RunState::*;
        let ok = matches!(
            (self, next),
            (Waiting, Running)
                | (Waiting, TimedOut)
                | (Waiting, Cancelled)
                | (Waiting, Failed)
                | (Running, Loading)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Loading, Succeeded)
                | (Loading, Failed)
        );
        if ok {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Waiting => "waiting",
            RunState::Running => "running",
            RunState::Loading => "loading",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
            RunState::TimedOut => "timed_out",
            RunState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Per-stage result inside one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Succeeded { rows: u64, digest: String },
    Failed { cause: String },
    Skipped { because: String },
}

impl StageStatus {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, StageStatus::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: String,
    pub output: String,
    #[serde(flatten)]
    pub status: StageStatus,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub inserted: u64,
    pub duplicates: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,
    pub run_id: RunId,
    pub pipeline: String,

    /// Stable hash of the pipeline spec (stage wiring and params).
    pub plan_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    pub state: RunState,
    pub stages: Vec<StageOutcome>,
    pub load: Option<LoadSummary>,

    /// Digest of the final artifact handed to the loader.
    pub outputs_digest: Option<String>,

    /// Human-readable cause for non-successful runs.
    pub error: Option<String>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(run_id: RunId, pipeline: impl Into<String>, plan_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            run_id,
            pipeline: pipeline.into(),
            plan_hash,
            engine_version: crate::VERSION.to_string(),
            state: RunState::Waiting,
            stages: Vec::new(),
            load: None,
            outputs_digest: None,
            error: None,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, state: RunState) -> Self {
        self.finished_ms = finished_ms;
        self.state = state;
        self
    }

    pub fn stage(&self, name: &str) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let s = RunState::Waiting
            .transition(RunState::Running)
            .and_then(|s| s.transition(RunState::Loading))
            .and_then(|s| s.transition(RunState::Succeeded))
            .unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn loading_cannot_be_skipped_or_left_for_cancelled() {
        assert!(RunState::Waiting.transition(RunState::Loading).is_err());
        assert!(RunState::Running.transition(RunState::Succeeded).is_err());
        assert!(RunState::Loading.transition(RunState::Cancelled).is_err());
        assert!(RunState::Succeeded.transition(RunState::Running).is_err());
    }

    #[test]
    fn stage_status_serializes_with_tag() {
        let outcome = StageOutcome {
            stage: "sort".into(),
            output: "sorted".into(),
            status: StageStatus::Skipped {
                because: "fill".into(),
            },
            elapsed_ms: 0,
        };
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["status"], "skipped");
        assert_eq!(v["because"], "fill");
    }
}
