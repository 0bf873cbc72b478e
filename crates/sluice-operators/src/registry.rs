//! Op key -> transform resolution.
//!
//! A stage names its transform with an `op` key and an optional JSON
//! `params` object. Built-in keys:
//!
//! | key | params |
//! |---|---|
//! | `fill_nulls` | `sentinel` (defaults to the engine sentinel) |
//! | `temporal_sort` | `from` (`at`), `to` (`created_date`) |
//! | `sanitize_content` | `column` (`content`) |
//! | `rename` | `columns`: map of old -> new |

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::fill_nulls::FillNulls;
use crate::map::Rename;
use crate::sanitize::SanitizeContent;
use crate::sort::TemporalSort;
use crate::traits::{OpError, Transform};

/// Engine-wide defaults available to factories.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub sentinel: String,
}

impl Default for OpContext {
    fn default() -> Self {
        Self {
            sentinel: "-".to_string(),
        }
    }
}

type Factory =
    Arc<dyn Fn(&serde_json::Value, &OpContext) -> Result<Arc<dyn Transform>, OpError> + Send + Sync>;

#[derive(Clone)]
pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FillNullsParams {
    sentinel: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TemporalSortParams {
    #[serde(default = "default_from")]
    from: String,
    #[serde(default = "default_to")]
    to: String,
}

fn default_from() -> String {
    "at".into()
}

fn default_to() -> String {
    "created_date".into()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SanitizeParams {
    #[serde(default = "default_column")]
    column: String,
}

fn default_column() -> String {
    "content".into()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RenameParams {
    columns: BTreeMap<String, String>,
}

fn params<T: DeserializeOwned>(op: &str, value: &serde_json::Value) -> Result<T, OpError> {
    let value = if value.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        value.clone()
    };
    serde_json::from_value(value).map_err(|e| OpError::Plan(format!("{op}: bad params: {e}")))
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    /// Registry without any transforms.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in transforms.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register("fill_nulls", |p, ctx| {
            let p: FillNullsParams = params("fill_nulls", p)?;
            Ok(Arc::new(FillNulls {
                sentinel: p.sentinel.unwrap_or_else(|| ctx.sentinel.clone()),
            }))
        });
        reg.register("temporal_sort", |p, _| {
            let p: TemporalSortParams = params("temporal_sort", p)?;
            Ok(Arc::new(TemporalSort { from: p.from, to: p.to }))
        });
        reg.register("sanitize_content", |p, _| {
            let p: SanitizeParams = params("sanitize_content", p)?;
            Ok(Arc::new(SanitizeContent { column: p.column }))
        });
        reg.register("rename", |p, _| {
            let p: RenameParams = params("rename", p)?;
            Ok(Arc::new(Rename { renames: p.columns }))
        });
        reg
    }

    /// Add or replace the factory for `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value, &OpContext) -> Result<Arc<dyn Transform>, OpError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(key.into(), Arc::new(factory));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the transform for `key` with `params`.
    pub fn build(
        &self,
        key: &str,
        params: &serde_json::Value,
        ctx: &OpContext,
    ) -> Result<Arc<dyn Transform>, OpError> {
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| OpError::Plan(format!("unknown op '{key}'")))?;
        factory(params, ctx)
    }
}
