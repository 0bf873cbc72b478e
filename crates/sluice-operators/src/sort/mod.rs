//! Temporal sort: rename the timestamp column, then order rows by it.

use sluice_core::types::RowBatch;

use crate::traits::{single_input, OpError, Transform};

/// Rename `from` to `to` and stable-sort ascending by `to`.
///
/// ISO-8601 timestamps sort chronologically under string comparison, so no
/// parsing is done; numeric epoch columns sort by value.
pub struct TemporalSort {
    pub from: String,
    pub to: String,
}

impl Default for TemporalSort {
    fn default() -> Self {
        Self {
            from: "at".to_string(),
            to: "created_date".to_string(),
        }
    }
}

impl Transform for TemporalSort {
    fn name(&self) -> &'static str {
        "temporal_sort"
    }

    fn plan(&self, input_columns: &[Vec<String>]) -> Result<Vec<String>, OpError> {
        let cols = single_input(self.name(), input_columns)?;
        if !cols.iter().any(|c| *c == self.from) {
            return Err(OpError::Schema(format!(
                "sort column '{}' not found",
                self.from
            )));
        }
        if self.from != self.to && cols.iter().any(|c| *c == self.to) {
            return Err(OpError::Schema(format!(
                "cannot rename '{}' to existing column '{}'",
                self.from, self.to
            )));
        }
        Ok(cols
            .iter()
            .map(|c| if *c == self.from { self.to.clone() } else { c.clone() })
            .collect())
    }

    fn apply(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let mut out = single_input(self.name(), inputs)?.clone();
        self.plan(&[out.column_names().iter().map(|s| s.to_string()).collect()])?;
        out.rename_column(&self.from, &self.to)
            .map_err(|e| OpError::Schema(e.to_string()))?;
        out.sort_by_columns(std::slice::from_ref(&self.to))?;
        Ok(out)
    }
}
