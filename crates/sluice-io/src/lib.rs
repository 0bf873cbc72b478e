#![forbid(unsafe_code)]
//! sluice-io: everything that touches bytes.
//!
//! - `storage`: the `Storage` trait with filesystem and in-memory backends.
//! - `artifact`: run-scoped, write-once artifact store on top of `Storage`.
//! - `readers::csv`: delimited source files into `RowBatch`.
//! - `writers::jsonl`: NDJSON encoding of documents.
//! - `sink`: document sinks with duplicate-key rejection.

pub mod artifact;
pub mod error;
pub mod memory_storage;
pub mod readers;
pub mod sink;
pub mod storage;
pub mod writers;

pub use artifact::ArtifactStore;
pub use error::{Error, Result};
pub use memory_storage::MemoryStorage;
pub use sink::{Document, DocumentSink, InsertSummary, JsonlSink, MemorySink};
pub use storage::{FsStorage, Storage};
