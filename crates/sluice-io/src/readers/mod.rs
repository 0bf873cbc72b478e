//! Readers that turn source files into `RowBatch`.

pub mod csv;

pub use self::csv::{read_csv, type_column};
