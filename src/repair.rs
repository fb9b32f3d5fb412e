//! Whole-file repair: parallel row alignment and the `repair` subcommand.
//!
//! Alignment is embarrassingly parallel at row granularity: every row's
//! matrix and search depend only on that row's tokens and the immutable
//! schema. Rows are processed on the rayon pool and results are keyed by
//! original line index, so output order always matches input order no matter
//! which worker finished first.

use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;

use crate::{
    align::{AlignOptions, RowOutcome, align_row},
    cli::RepairArgs,
    io_utils,
    parsed::ParsedCollection,
    schema::Schema,
    table,
};

/// Aligns every data row of a file against the schema.
///
/// When [`AlignOptions::has_header`] is set, the first line is excluded from
/// processing (never validated) but still owns line index 0, so invalid-row
/// indices always point into the original file.
pub fn align_file(lines: &[String], schema: &Schema, options: &AlignOptions) -> Result<ParsedCollection> {
    let offset = usize::from(options.has_header && !lines.is_empty());
    let outcomes: Vec<RowOutcome> = lines[offset..]
        .par_iter()
        .enumerate()
        .map(|(idx, line)| align_row(line, idx + offset, schema, options))
        .collect::<Result<Vec<_>>>()?;
    Ok(ParsedCollection::from_outcomes(outcomes))
}

pub fn execute(args: &RepairArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Repairing '{}' with delimiter '{}'",
        args.input.display(),
        io_utils::printable_delimiter(delimiter)
    );

    let schema = Schema::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    let lines = io_utils::read_lines(&args.input, encoding)?;
    let options = AlignOptions {
        has_header: !args.no_header,
        show_alternatives: args.show_alternatives,
        delimiter: delimiter as char,
    };

    let parsed = align_file(&lines, &schema, &options)?;
    let writer = io_utils::open_output(args.output.as_deref())?;
    parsed
        .export(writer, &schema, delimiter)
        .context("Writing repaired output")?;

    if args.invalid_report && parsed.invalid_count() > 0 {
        table::print_table(
            &ParsedCollection::invalid_report_headers(),
            &parsed.invalid_report_rows(),
        );
        for outcome in parsed.outcomes() {
            if let RowOutcome::Invalid { line_index, alternatives, .. } = outcome {
                for candidate in alternatives {
                    info!("Line {line_index} candidate: {}", candidate.join(" | "));
                }
            }
        }
    }

    info!(
        "Processed {} row(s): {} repaired, {} invalid",
        parsed.len(),
        parsed.valid_count(),
        parsed.invalid_count()
    );
    Ok(())
}
