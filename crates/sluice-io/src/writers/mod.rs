//! Writers for loaded documents.

pub mod jsonl;

pub use jsonl::JsonlWriter;
