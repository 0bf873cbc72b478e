//! Strongly-typed identifiers used across the engine.
//!
//! Downstream crates should *not* pass raw integers or strings for IDs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// Declaration index of a stage inside its pipeline.
new_id!(StageId);

/// Identity of one run. Usually the scheduled timestamp, e.g. `2023-05-09T00:00:00Z`.
///
/// Run ids become path segments in the artifact store, so separators and
/// parent references are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::Config("run id must not be empty".into()));
        }
        if id.starts_with('.') || id.contains(&['/', '\\'][..]) || id.chars().any(char::is_control) {
            return Err(Error::Config(format!("run id '{id}' is not a safe path segment")));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RunId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        RunId::new(value)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RunId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RunId::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_run_ids_are_accepted() {
        let id = RunId::new("2023-05-09T00:00:00Z").unwrap();
        assert_eq!(id.as_str(), "2023-05-09T00:00:00Z");
    }

    #[test]
    fn path_like_run_ids_are_rejected() {
        for bad in ["", "../etc", "a/b", "a\\b", ".hidden"] {
            assert!(RunId::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn run_id_deserialization_validates() {
        let ok: RunId = serde_json::from_str("\"manual-1\"").unwrap();
        assert_eq!(ok.to_string(), "manual-1");
        assert!(serde_json::from_str::<RunId>("\"x/y\"").is_err());
    }
}
