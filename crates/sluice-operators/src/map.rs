//! Map transform with column renaming support.

use std::collections::BTreeMap;

use sluice_core::types::{Column, RowBatch};

use crate::traits::{single_input, OpError, Transform};

#[derive(Default)]
pub struct Rename {
    /// Column rename map: old_name -> new_name
    pub renames: BTreeMap<String, String>,
}

impl Rename {
    fn renamed(&self, name: &str) -> String {
        self.renames
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

impl Transform for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn plan(&self, input_columns: &[Vec<String>]) -> Result<Vec<String>, OpError> {
        let cols = single_input(self.name(), input_columns)?;
        if let Some(missing) = self.renames.keys().find(|k| !cols.contains(k)) {
            return Err(OpError::Schema(format!("column '{missing}' not found")));
        }
        let out: Vec<String> = cols.iter().map(|c| self.renamed(c)).collect();
        for (i, name) in out.iter().enumerate() {
            if out[..i].contains(name) {
                return Err(OpError::Schema(format!(
                    "rename produces duplicate column '{name}'"
                )));
            }
        }
        Ok(out)
    }

    fn apply(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let input = single_input(self.name(), inputs)?;

        // If no renames, pass through
        if self.renames.is_empty() {
            return Ok(input.clone());
        }

        let names = self.plan(&[input.column_names().iter().map(|s| s.to_string()).collect()])?;
        let columns = input
            .columns
            .iter()
            .zip(names)
            .map(|(col, name)| Column::new(name, col.values.clone()))
            .collect();
        Ok(RowBatch::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::types::Scalar;

    fn rename(pairs: &[(&str, &str)]) -> Rename {
        Rename {
            renames: pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        }
    }

    #[test]
    fn renames_in_place_and_swaps_are_allowed() {
        let input =
            RowBatch::from_rows(&["a", "b"], vec![vec![Scalar::I64(1), Scalar::I64(2)]]).unwrap();
        let out = rename(&[("a", "b"), ("b", "a")]).apply(&[input]).unwrap();
        assert_eq!(out.column_names(), vec!["b", "a"]);
        assert_eq!(out.column("a").unwrap().values, vec![Scalar::I64(2)]);
    }

    #[test]
    fn collisions_and_unknown_columns_are_rejected() {
        let cols = vec![vec!["a".to_string(), "b".to_string()]];
        assert!(rename(&[("a", "b")]).plan(&cols).is_err());
        assert!(rename(&[("zzz", "y")]).plan(&cols).is_err());
    }
}
