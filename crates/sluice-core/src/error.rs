use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid pipeline: {0}")]
    Pipeline(String),

    #[error("Row batch error: {0}")]
    Batch(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("invalid run transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
