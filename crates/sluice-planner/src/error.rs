use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid pipeline: {0}")]
    Invalid(String),

    #[error("stage '{stage}': {cause}")]
    Binding { stage: String, cause: String },
}

impl From<sluice_core::error::Error> for PlanError {
    fn from(e: sluice_core::error::Error) -> Self {
        PlanError::Invalid(e.to_string())
    }
}
