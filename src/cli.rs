use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Repair CSV rows with unescaped delimiters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Repair a delimited file against a schema, separating valid and invalid rows
    Repair(RepairArgs),
    /// Diagnose a single raw row against a schema
    Check(CheckArgs),
    /// Show a schema's columns and constraints as a table
    Schema(SchemaArgs),
}

#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Input delimited file to repair ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Schema YAML file describing the expected columns
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
    /// Output file for repaired rows (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Treat the first line as data instead of a header
    #[arg(long = "no-header")]
    pub no_header: bool,
    /// Collect competing alignments for ambiguous rows
    #[arg(long = "show-alternatives")]
    pub show_alternatives: bool,
    /// Print a table of invalid rows after processing
    #[arg(long = "invalid-report")]
    pub invalid_report: bool,
    /// Field delimiter (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Schema YAML file describing the expected columns
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
    /// Raw row text to diagnose
    #[arg(short = 'r', long = "row")]
    pub row: String,
    /// Field delimiter (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Schema YAML file to describe
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
