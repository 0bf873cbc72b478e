//! Null normalization.

use sluice_core::types::{RowBatch, Scalar};

use crate::traits::{single_input, OpError, Transform};

/// Replace every blank cell (`Null` or `""`) with a sentinel string.
pub struct FillNulls {
    pub sentinel: String,
}

impl Default for FillNulls {
    fn default() -> Self {
        Self {
            sentinel: "-".to_string(),
        }
    }
}

impl Transform for FillNulls {
    fn name(&self) -> &'static str {
        "fill_nulls"
    }

    fn plan(&self, input_columns: &[Vec<String>]) -> Result<Vec<String>, OpError> {
        if self.sentinel.is_empty() {
            return Err(OpError::Plan("fill_nulls sentinel must not be empty".into()));
        }
        Ok(single_input(self.name(), input_columns)?.clone())
    }

    fn apply(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let mut out = single_input(self.name(), inputs)?.clone();
        for col in &mut out.columns {
            for value in &mut col.values {
                if value.is_blank() {
                    *value = Scalar::Str(self.sentinel.clone());
                }
            }
        }
        Ok(out)
    }
}
