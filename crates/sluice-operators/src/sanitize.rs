//! Content sanitization.
//!
//! Keeps ASCII letters, whitespace and the punctuation `. , ? ! '` in one
//! text column and deletes everything else (emoji, digits, symbols, accented
//! letters). Row count and the column set never change.

use sluice_core::types::{RowBatch, Scalar};

use crate::traits::{single_input, OpError, Transform};

pub struct SanitizeContent {
    pub column: String,
}

impl Default for SanitizeContent {
    fn default() -> Self {
        Self {
            column: "content".to_string(),
        }
    }
}

/// Whether `c` survives sanitization.
pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphabetic()
        || c.is_whitespace()
        // information separators count as whitespace too
        || ('\u{1c}'..='\u{1f}').contains(&c)
        || matches!(c, '.' | ',' | '?' | '!' | '\'')
}

pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| is_allowed(*c)).collect()
}

impl Transform for SanitizeContent {
    fn name(&self) -> &'static str {
        "sanitize_content"
    }

    fn plan(&self, input_columns: &[Vec<String>]) -> Result<Vec<String>, OpError> {
        let cols = single_input(self.name(), input_columns)?;
        if !cols.iter().any(|c| *c == self.column) {
            return Err(OpError::Schema(format!(
                "column '{}' not found",
                self.column
            )));
        }
        Ok(cols.clone())
    }

    fn apply(&self, inputs: &[RowBatch]) -> Result<RowBatch, OpError> {
        let mut out = single_input(self.name(), inputs)?.clone();
        let col = out
            .column_mut(&self.column)
            .ok_or_else(|| OpError::Schema(format!("column '{}' not found", self.column)))?;

        for (row, value) in col.values.iter_mut().enumerate() {
            match value {
                Scalar::Str(text) => {
                    if !text.chars().all(is_allowed) {
                        *text = sanitize(text);
                    }
                }
                other => {
                    return Err(OpError::Exec(format!(
                        "row {row}: expected string in '{}', found {}",
                        self.column,
                        other.type_name()
                    )))
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(contents: Vec<Scalar>) -> RowBatch {
        let other = (0..contents.len() as i64).map(Scalar::I64).collect();
        RowBatch::new(vec![
            sluice_core::types::Column::new("content", contents),
            sluice_core::types::Column::new("score", other),
        ])
        .unwrap()
    }

    #[test]
    fn strips_emoji_digits_and_symbols() {
        assert_eq!(sanitize("Hi! 😀"), "Hi! ");
        assert_eq!(sanitize("Top 10 app #1 — café?"), "Top  app   caf?");
        assert_eq!(sanitize("don't,stop.\n\tok"), "don't,stop.\n\tok");
        assert_eq!(sanitize("🔥🔥"), "");
    }

    #[test]
    fn only_the_target_column_changes() {
        let input = batch(vec!["a1".into(), "b".into()]);
        let out = SanitizeContent::default().apply(std::slice::from_ref(&input)).unwrap();
        assert_eq!(out.column_names(), input.column_names());
        assert_eq!(out.num_rows(), input.num_rows());
        assert_eq!(out.column("score"), input.column("score"));
        assert_eq!(out.column("content").unwrap().values, vec!["a".into(), "b".into()]);
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let input = batch(vec!["Wow!!! 💯 5 stars ⭐".into(), "plain".into()]);
        let t = SanitizeContent::default();
        let once = t.apply(&[input]).unwrap();
        let twice = t.apply(std::slice::from_ref(&once)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn non_string_cells_fail_the_stage() {
        let input = batch(vec!["ok".into(), Scalar::I64(7)]);
        let err = SanitizeContent::default().apply(&[input]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let t = SanitizeContent {
            column: "body".into(),
        };
        assert!(matches!(
            t.plan(&[vec!["content".into()]]),
            Err(OpError::Schema(_))
        ));
    }
}
