pub mod align;
pub mod cli;
pub mod data;
pub mod io_utils;
pub mod matrix;
pub mod parsed;
pub mod repair;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use crate::{
    align::{AlignOptions, RowOutcome, align_row},
    cli::{Cli, Commands},
    schema::Schema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_realign", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Repair(args) => repair::execute(&args),
        Commands::Check(args) => handle_check(&args),
        Commands::Schema(args) => handle_schema(&args),
    }
}

fn handle_check(args: &cli::CheckArgs) -> Result<()> {
    let schema = Schema::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    let options = AlignOptions {
        has_header: false,
        show_alternatives: true,
        delimiter: args.delimiter.unwrap_or(io_utils::DEFAULT_DELIMITER) as char,
    };
    match align_row(&args.row, 0, &schema, &options)? {
        RowOutcome::Valid { record, .. } => {
            let headers = schema.headers();
            let cells = record.display_cells(&schema);
            let rows = vec![cells];
            table::print_table(&headers, &rows);
        }
        RowOutcome::Invalid {
            reason,
            alternatives,
            ..
        } => {
            println!("invalid row: {reason}");
            for candidate in &alternatives {
                println!("candidate: {}", candidate.join(" | "));
            }
        }
    }
    Ok(())
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let schema = Schema::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    table::print_table(&Schema::describe_headers(), &schema.describe_rows());
    Ok(())
}
