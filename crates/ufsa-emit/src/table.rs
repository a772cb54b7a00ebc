//! In-memory tables and their CSV serialization

use crate::{Error, Result};
use csv::{Terminator, WriterBuilder};
use std::io::Write;
use tracing::trace;

/// A named table with a fixed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table; `name` is also its file name
    pub fn new(name: impl Into<String>, headers: &[&'static str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[&'static str] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; it must match the header width
    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len(), "row width for {}", self.name);
        self.rows.push(row);
    }

    /// Sort rows lexicographically by column and drop exact duplicates
    pub fn sort(&mut self) {
        self.rows.sort();
        self.rows.dedup();
    }

    /// Write the header and all rows as CSV with `\n` terminators
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);

        csv_writer
            .write_record(&self.headers)
            .map_err(|e| Error::write(&self.name, e.to_string()))?;
        for row in &self.rows {
            csv_writer
                .write_record(row)
                .map_err(|e| Error::write(&self.name, e.to_string()))?;
            trace!(table = %self.name, ?row, "Wrote CSV row");
        }
        csv_writer
            .flush()
            .map_err(|e| Error::write(&self.name, e.to_string()))?;
        Ok(())
    }

    /// Render the table to a string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut output = Vec::new();
        self.write(&mut output)?;
        String::from_utf8(output).map_err(|e| Error::write(&self.name, e.to_string()))
    }
}
