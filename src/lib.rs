#![forbid(unsafe_code)]
//! sluice: a file-triggered batch pipeline.
//!
//! Facade over the workspace crates. Integration tests and benches live in the
//! root package and reach the layers through these re-exports.

pub use sluice_core;
pub use sluice_exec;
pub use sluice_io;
pub use sluice_operators;
pub use sluice_planner;
