//! Lightweight row/column containers for tabular artifacts.
//!
//! Artifacts are stored column-major (`RowBatch`) but the pipeline reasons about
//! them as ordered rows, so `RowBatch` offers both views.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single cell value. `Null` is distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    I64(i64),
    F64(f64),
    Str(String),
}

impl Scalar {
    /// Missing or empty: `Null` or a zero-length string.
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::I64(_) => "integer",
            Scalar::F64(_) => "float",
            Scalar::Str(_) => "string",
        }
    }

    /// Document representation used by sinks.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::I64(i) => serde_json::Value::from(*i),
            Scalar::F64(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered rows of named columns. Column order is significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    /// Build a batch from columns, rejecting ragged or duplicate columns.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let batch = Self { columns };
        batch.validate()?;
        Ok(batch)
    }

    /// Build a batch from row-major values laid out in `names` order.
    pub fn from_rows(names: &[&str], rows: Vec<Vec<Scalar>>) -> Result<Self> {
        let mut columns: Vec<Column> = names
            .iter()
            .map(|n| Column::new(*n, Vec::with_capacity(rows.len())))
            .collect();
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(Error::Batch(format!(
                    "row {idx} has {} values, expected {}",
                    row.len(),
                    names.len()
                )));
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.values.push(value);
            }
        }
        Self::new(columns)
    }

    pub fn validate(&self) -> Result<()> {
        let rows = self.num_rows();
        for (i, col) in self.columns.iter().enumerate() {
            if col.len() != rows {
                return Err(Error::Batch(format!(
                    "column '{}' has {} values, expected {}",
                    col.name,
                    col.len(),
                    rows
                )));
            }
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::Batch(format!("duplicate column '{}'", col.name)));
            }
        }
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Row `idx` as `(column, value)` pairs in column order.
    pub fn row(&self, idx: usize) -> Option<Vec<(&str, &Scalar)>> {
        if idx >= self.num_rows() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.as_str(), &c.values[idx]))
                .collect(),
        )
    }

    /// Rename column `from` to `to` in place, keeping its position.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.column_index(to).is_some() {
            return Err(Error::Batch(format!("column '{to}' already exists")));
        }
        let col = self
            .column_mut(from)
            .ok_or_else(|| Error::Batch(format!("column '{from}' not found")))?;
        col.name = to.to_string();
        Ok(())
    }

    /// Sort rows by the specified columns (in order).
    ///
    /// The sort is stable: rows with equal keys keep their input order.
    pub fn sort_by_columns(&mut self, sort_keys: &[String]) -> Result<()> {
        let num_rows = self.num_rows();
        if num_rows == 0 {
            return Ok(());
        }

        let key_indices: Vec<usize> = sort_keys
            .iter()
            .map(|key| {
                self.column_index(key)
                    .ok_or_else(|| Error::Batch(format!("sort key column '{}' not found", key)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..num_rows).collect();
        order.sort_by(|&a, &b| {
            for &col_idx in &key_indices {
                let values = &self.columns[col_idx].values;
                match scalar_cmp(&values[a], &values[b]) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        });

        for col in &mut self.columns {
            let mut original: Vec<Option<Scalar>> =
                std::mem::take(&mut col.values).into_iter().map(Some).collect();
            col.values = order
                .iter()
                .map(|&idx| original[idx].take().unwrap_or(Scalar::Null))
                .collect();
        }

        Ok(())
    }
}

/// Compare two scalars for sorting.
///
/// Nulls sort first, numbers compare by value (integers and floats mix),
/// strings compare lexicographically.
pub fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    use Scalar::*;

    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (I64(x), I64(y)) => x.cmp(y),
        (F64(x), F64(y)) => float_cmp(*x, *y),
        (I64(x), F64(y)) => float_cmp(*x as f64, *y),
        (F64(x), I64(y)) => float_cmp(*x, *y as f64),
        (Str(x), Str(y)) => x.cmp(y),
        _ => scalar_type_order(a).cmp(&scalar_type_order(b)),
    }
}

fn float_cmp(x: f64, y: f64) -> Ordering {
    if x.is_nan() && y.is_nan() {
        Ordering::Equal
    } else if x.is_nan() {
        Ordering::Greater
    } else if y.is_nan() {
        Ordering::Less
    } else {
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
}

/// Assign a numeric order to scalar types for mixed-type comparisons.
fn scalar_type_order(s: &Scalar) -> u8 {
    match s {
        Scalar::Null => 0,
        Scalar::I64(_) | Scalar::F64(_) => 1,
        Scalar::Str(_) => 2,
    }
}
