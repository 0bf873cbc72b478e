//! Pipeline description languages.

pub mod yaml;
