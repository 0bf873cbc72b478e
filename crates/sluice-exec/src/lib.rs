#![forbid(unsafe_code)]
//! sluice-exec: everything that happens during a run.
//!
//! `PipelineRunner` waits on the `ArrivalGate`, ingests the source file,
//! drives the stage `Engine` in dependency order, hands the final artifact
//! to the `Loader`, and records a `RunManifest`. `CadenceScheduler` fires
//! runs on a fixed interval.

pub mod cancel;
pub mod error;
pub mod gate;
pub mod loader;
pub mod metrics;
pub mod runner;
pub mod runtime;
pub mod scheduler;

pub use cancel::CancelToken;
pub use error::PipelineError;
pub use gate::{ArrivalGate, GateOutcome};
pub use loader::Loader;
pub use runner::PipelineRunner;
pub use runtime::{Engine, StageRun};
pub use scheduler::{CadenceScheduler, TickSummary};
