//! Streaming NDJSON writer.

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::sink::Document;

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    written: u64,
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Write one document as a single line.
    pub fn write_document(&mut self, doc: &Document) -> Result<()> {
        let line = serde_json::to_string(doc)?;
        writeln!(self.writer, "{}", line)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffered lines and hand back the inner writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_line_per_document_in_key_order() {
        let mut w = JsonlWriter::to_writer(Vec::new());
        for v in [json!({"b": 1, "a": "x"}), json!({"a": null})] {
            let doc = v.as_object().cloned().unwrap();
            w.write_document(&doc).unwrap();
        }
        assert_eq!(w.written(), 2);
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        assert_eq!(out, "{\"a\":\"x\",\"b\":1}\n{\"a\":null}\n");
    }
}
