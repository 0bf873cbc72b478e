#![forbid(unsafe_code)]
//! sluice-core: pure data shared by every layer.
//!
//! Rows and artifacts (`types`), identifiers (`id`), the declarative stage graph
//! (`dag`), stable hashing (`hash`), run manifests (`manifest`) and engine
//! configuration (`config`). No I/O lives here.

pub mod config;
pub mod dag;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod types;

/// Engine version recorded in every run manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
