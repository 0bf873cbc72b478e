//! Delimited text reader.
//!
//! The first record is the header. Each column gets one type: an empty cell
//! is always `Null`; the rest are `I64` when every non-empty cell in the
//! column is an integer, `F64` when every one is a finite number, and `Str`
//! otherwise.

use sluice_core::types::{Column, RowBatch, Scalar};

use crate::error::{Error, Result};

/// Parse a whole delimited file into a single batch.
pub fn read_csv(bytes: &[u8], delimiter: char) -> Result<RowBatch> {
    if !delimiter.is_ascii() {
        return Err(Error::Csv(format!("delimiter {delimiter:?} is not ASCII")));
    }
    let mut rdr = ::csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(Error::Csv("missing header row".into()));
    }
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (cells, field) in raw.iter_mut().zip(record.iter()) {
            cells.push(field.to_string());
        }
    }

    let columns = headers
        .iter()
        .zip(raw)
        .map(|(h, cells)| Column::new(h.trim_start_matches('\u{feff}'), type_column(cells)))
        .collect();
    Ok(RowBatch::new(columns)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Int,
    Float,
    Text,
}

fn kind_of(raw: &str) -> Kind {
    if raw.parse::<i64>().is_ok() {
        Kind::Int
    } else if raw.parse::<f64>().map_or(false, f64::is_finite) {
        Kind::Float
    } else {
        Kind::Text
    }
}

/// Type one column's raw cells as a unit.
pub fn type_column(cells: Vec<String>) -> Vec<Scalar> {
    let kind = cells
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| kind_of(c))
        .max()
        .unwrap_or(Kind::Text);

    cells
        .into_iter()
        .map(|c| {
            if c.is_empty() {
                return Scalar::Null;
            }
            // the column kind was derived from these same cells
            match kind {
                Kind::Int => c.parse().map(Scalar::I64).unwrap_or(Scalar::Str(c)),
                Kind::Float => c.parse().map(Scalar::F64).unwrap_or(Scalar::Str(c)),
                Kind::Text => Scalar::Str(c),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_are_typed() {
        let data = b"at,content,x\n2023-01-02,Hi,\n2023-01-01,Bye.,5\n";
        let batch = read_csv(data, ',').unwrap();
        assert_eq!(batch.column_names(), vec!["at", "content", "x"]);
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(
            batch.column("x").unwrap().values,
            vec![Scalar::Null, Scalar::I64(5)]
        );
        assert_eq!(
            batch.column("at").unwrap().values[0],
            Scalar::Str("2023-01-02".into())
        );
    }

    #[test]
    fn quoted_fields_keep_delimiters_and_newlines() {
        let data = b"content,score\n\"a, b\nc\",1.5\n";
        let batch = read_csv(data, ',').unwrap();
        assert_eq!(
            batch.column("content").unwrap().values[0],
            Scalar::Str("a, b\nc".into())
        );
        assert_eq!(batch.column("score").unwrap().values[0], Scalar::F64(1.5));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let data = b"a,b\n1,2\n3\n";
        assert!(matches!(read_csv(data, ','), Err(Error::Csv(_))));
    }

    #[test]
    fn custom_delimiter_and_header_only_file() {
        let batch = read_csv(b"a;b\n", ';').unwrap();
        assert_eq!(batch.column_names(), vec!["a", "b"]);
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn one_word_turns_the_whole_column_into_strings() {
        let data = b"content,userName,price\n10,007,12.50\nGreat app,bob,3\n";
        let batch = read_csv(data, ',').unwrap();
        assert_eq!(
            batch.column("content").unwrap().values,
            vec![Scalar::Str("10".into()), Scalar::Str("Great app".into())]
        );
        assert_eq!(
            batch.column("userName").unwrap().values,
            vec![Scalar::Str("007".into()), Scalar::Str("bob".into())]
        );
        // mixed integers and floats widen to floats
        assert_eq!(
            batch.column("price").unwrap().values,
            vec![Scalar::F64(12.5), Scalar::F64(3.0)]
        );
    }

    #[test]
    fn non_finite_and_words_stay_strings() {
        let typed = |cells: &[&str]| type_column(cells.iter().map(|c| c.to_string()).collect());
        assert_eq!(typed(&["inf", "1"]), vec![Scalar::Str("inf".into()), Scalar::Str("1".into())]);
        assert_eq!(typed(&["NaN"]), vec![Scalar::Str("NaN".into())]);
        assert_eq!(typed(&["-7", ""]), vec![Scalar::I64(-7), Scalar::Null]);
        assert_eq!(typed(&[" "]), vec![Scalar::Str(" ".into())]);
        assert_eq!(typed(&["", ""]), vec![Scalar::Null, Scalar::Null]);
    }
}
