use thiserror::Error;

/// Result type local to sluice-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("artifact '{name}' already exists for run {run_id}")]
    ArtifactExists { run_id: String, name: String },

    #[error("artifact '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("sink error: {0}")]
    Sink(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] sluice_core::error::Error),
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Csv(e.to_string())
    }
}
