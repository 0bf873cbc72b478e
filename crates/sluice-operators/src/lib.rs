#![forbid(unsafe_code)]
//! sluice-operators: the deterministic transforms a stage can run.
//!
//! Every transform is pure: the same input batches always yield the same
//! output batch, and inputs are never mutated. The exec runtime resolves
//! a stage's `op` key through [`Registry`] and then calls `plan` followed
//! by `apply`.

pub mod fill_nulls;
pub mod map;
pub mod registry;
pub mod sanitize;
pub mod sort;
pub mod traits;

pub use fill_nulls::FillNulls;
pub use map::Rename;
pub use registry::{OpContext, Registry};
pub use sanitize::SanitizeContent;
pub use sort::TemporalSort;
pub use traits::{OpError, Transform};
