//! Aggregated per-file alignment outcomes.
//!
//! A [`ParsedCollection`] is produced by one run over a file's rows and is
//! immutable afterwards: valid records and invalid entries stay partitioned
//! but both keep their original 0-based line indices, so an invalid row can
//! be located in the source file even after filtering.

use std::io::Write;

use anyhow::{Context, Result};
use csv::QuoteStyle;

use crate::{
    align::{AlignmentFailure, Record, RowOutcome},
    schema::Schema,
};

/// One invalid row as surfaced to reports: `(line_index, reason, raw_line)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidEntry<'a> {
    pub line_index: usize,
    pub reason: AlignmentFailure,
    pub raw: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedCollection {
    outcomes: Vec<RowOutcome>,
}

impl ParsedCollection {
    pub fn from_outcomes(outcomes: Vec<RowOutcome>) -> Self {
        ParsedCollection { outcomes }
    }

    pub fn outcomes(&self) -> &[RowOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Valid records in original file order, with their line indices.
    pub fn valid_records(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RowOutcome::Valid { line_index, record } => Some((*line_index, record)),
            RowOutcome::Invalid { .. } => None,
        })
    }

    /// Invalid entries in original file order.
    pub fn invalid_entries(&self) -> impl Iterator<Item = InvalidEntry<'_>> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RowOutcome::Invalid {
                line_index,
                reason,
                raw,
                ..
            } => Some(InvalidEntry {
                line_index: *line_index,
                reason: *reason,
                raw,
            }),
            RowOutcome::Valid { .. } => None,
        })
    }

    pub fn valid_count(&self) -> usize {
        self.valid_records().count()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_entries().count()
    }

    /// Writes the header and every valid record as delimited text. Fields
    /// that still contain the delimiter after reconstruction come out quoted,
    /// so the repaired file round-trips through a conventional CSV reader.
    pub fn export<W: Write>(&self, writer: W, schema: &Schema, delimiter: u8) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(writer);
        csv_writer
            .write_record(schema.headers())
            .context("Writing output headers")?;
        for (line_index, record) in self.valid_records() {
            csv_writer
                .write_record(record.display_cells(schema))
                .with_context(|| format!("Writing repaired row from line {line_index}"))?;
        }
        csv_writer.flush().context("Flushing output writer")?;
        Ok(())
    }

    /// Rows for the invalid-entry diagnostic table.
    pub fn invalid_report_rows(&self) -> Vec<Vec<String>> {
        self.invalid_entries()
            .map(|entry| {
                vec![
                    entry.line_index.to_string(),
                    entry.reason.to_string(),
                    entry.raw.to_string(),
                ]
            })
            .collect()
    }

    pub fn invalid_report_headers() -> Vec<String> {
        ["line", "reason", "raw"].iter().map(|s| s.to_string()).collect()
    }
}
