//! Transform trait + common interfaces.
//!
//! The exec runtime calls `plan(...)` with the column names of each input
//! to catch wiring mistakes before touching data, then `apply(...)` with the
//! input batches in declared order.

use sluice_core::types::RowBatch;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("schema error: {0}")]
    Schema(String),
}

impl From<sluice_core::error::Error> for OpError {
    fn from(e: sluice_core::error::Error) -> Self {
        OpError::Exec(e.to_string())
    }
}

/// Trait that all transforms must implement.
///
/// Invariants:
/// - `apply` must be deterministic given the same inputs.
/// - the columns of `apply`'s output equal what `plan` returned for the
///   same input columns.
pub trait Transform: Send + Sync + 'static {
    /// Human-readable transform name (stable).
    fn name(&self) -> &'static str;

    /// Number of input artifacts the transform consumes.
    fn arity(&self) -> usize {
        1
    }

    /// Given the input column names, return the output column names.
    fn plan(&self, input_columns: &[Vec<String>]) -> Result<Vec<String>, OpError>;

    /// Compute the output batch.
    fn apply(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError>;
}

/// First input of a unary transform.
pub(crate) fn single_input<'a, T>(name: &str, inputs: &'a [T]) -> Result<&'a T, OpError> {
    match inputs {
        [one] => Ok(one),
        _ => Err(OpError::Plan(format!(
            "{name} expects one input, got {}",
            inputs.len()
        ))),
    }
}
