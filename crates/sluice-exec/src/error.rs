use thiserror::Error;

/// Why a run did not reach `Succeeded`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("run {run_id}: '{artifact}' did not arrive within {waited_ms} ms")]
    GateTimeout {
        run_id: String,
        artifact: String,
        waited_ms: u64,
    },

    #[error("run {run_id}: stage '{stage}' failed: {cause}")]
    StageFailure {
        run_id: String,
        stage: String,
        cause: String,
    },

    #[error("run {run_id}: load failed: {cause}")]
    LoadFailure { run_id: String, cause: String },

    #[error("run {run_id}: cancelled")]
    Cancelled { run_id: String },

    #[error("run {active} is still in progress")]
    AlreadyRunning { active: String },

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("artifact store: {0}")]
    Io(String),
}

impl From<sluice_io::Error> for PipelineError {
    fn from(e: sluice_io::Error) -> Self {
        PipelineError::Io(e.to_string())
    }
}

impl From<sluice_core::error::Error> for PipelineError {
    fn from(e: sluice_core::error::Error) -> Self {
        PipelineError::Invalid(e.to_string())
    }
}

impl From<sluice_planner::PlanError> for PipelineError {
    fn from(e: sluice_planner::PlanError) -> Self {
        PipelineError::Invalid(e.to_string())
    }
}
