//! Engine configuration that downstream crates can serialize/deserialize.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory the arrival gate watches for the source artifact.
    pub source_root: String,

    /// Root of the per-run intermediate artifact namespaces.
    pub artifact_root: String,

    /// Root of the file-backed document sink.
    pub sink_root: String,

    /// Gate poll interval.
    pub poll_interval_ms: u64,

    /// Gate timeout; `None` waits until cancelled.
    pub gate_timeout_ms: Option<u64>,

    /// Split the bulk insert into chunks of this many documents; `None` sends one batch.
    pub load_batch_size: Option<usize>,

    /// Placeholder written into missing cells by null normalization.
    pub sentinel: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source_root: "/opt/sluice/data".to_string(),
            artifact_root: "/tmp/sluice-artifacts".to_string(),
            sink_root: "/tmp/sluice-sink".to_string(),
            poll_interval_ms: 30_000,
            gate_timeout_ms: None,
            load_batch_size: None,
            sentinel: "-".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SLUICE_SOURCE_ROOT`, `SLUICE_ARTIFACT_ROOT`, `SLUICE_SINK_ROOT`: directories
    /// - `SLUICE_POLL_INTERVAL_MS`: gate poll interval
    /// - `SLUICE_GATE_TIMEOUT_MS`: gate timeout
    /// - `SLUICE_LOAD_BATCH_SIZE`: documents per insert call
    /// - `SLUICE_SENTINEL`: null placeholder
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads from an arbitrary lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(s) = lookup("SLUICE_SOURCE_ROOT") {
            cfg.source_root = s;
        }

        if let Some(s) = lookup("SLUICE_ARTIFACT_ROOT") {
            cfg.artifact_root = s;
        }

        if let Some(s) = lookup("SLUICE_SINK_ROOT") {
            cfg.sink_root = s;
        }

        if let Some(s) = lookup("SLUICE_POLL_INTERVAL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.poll_interval_ms = v;
            }
        }

        if let Some(s) = lookup("SLUICE_GATE_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.gate_timeout_ms = Some(v);
            }
        }

        if let Some(s) = lookup("SLUICE_LOAD_BATCH_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.load_batch_size = Some(v).filter(|v| *v > 0);
            }
        }

        if let Some(s) = lookup("SLUICE_SENTINEL") {
            cfg.sentinel = s;
        }

        cfg
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn gate_timeout(&self) -> Option<Duration> {
        self.gate_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults_and_ignores_garbage() {
        let env: HashMap<&str, &str> = [
            ("SLUICE_SOURCE_ROOT", "/data"),
            ("SLUICE_POLL_INTERVAL_MS", "250"),
            ("SLUICE_GATE_TIMEOUT_MS", "not-a-number"),
            ("SLUICE_LOAD_BATCH_SIZE", "0"),
        ]
        .into_iter()
        .collect();
        let cfg = EngineConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.source_root, "/data");
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.gate_timeout(), None);
        assert_eq!(cfg.load_batch_size, None);
        assert_eq!(cfg.sentinel, "-");
    }

    #[test]
    fn partial_yaml_style_documents_fill_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"gate_timeout_ms": 1000}"#).unwrap();
        assert_eq!(cfg.gate_timeout(), Some(Duration::from_secs(1)));
        assert_eq!(cfg.poll_interval_ms, 30_000);
    }
}
