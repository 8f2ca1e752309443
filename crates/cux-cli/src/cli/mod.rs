//! CLI for the CUX Cognito exporter.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cux_core::{config, logging};
use std::path::PathBuf;

pub use commands::{run_dedupe, run_export};

/// Exit code for a user-initiated interruption (Ctrl-C).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Top-level CLI for the CUX exporter.
#[derive(Debug, Parser)]
#[command(name = "cux")]
#[command(about = "Export Cognito User Pool records to CSV, with retry and resume", long_about = None)]
pub struct Cli {
    /// Log verbosity (RUST_LOG overrides).
    #[arg(long, global = true, default_value = "info",
          value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Export users from a Cognito User Pool to a CSV file.
    Export(ExportArgs),

    /// Remove duplicate rows from an exported CSV by key columns.
    Dedupe(DedupeArgs),
}

#[derive(Debug, Args)]
#[command(group(
    clap::ArgGroup::new("columns")
        .required(true)
        .args(["export_attributes", "export_all"])
))]
pub struct ExportArgs {
    /// Attributes to save in the CSV, in column order.
    #[arg(long, short = 'a', num_args = 1.., value_name = "ATTR")]
    pub export_attributes: Vec<String>,

    /// Export all available attributes (discovered by sampling the pool).
    #[arg(long)]
    pub export_all: bool,

    /// The user pool ID.
    #[arg(long)]
    pub user_pool_id: String,

    /// The user pool region.
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// AWS profile to use.
    #[arg(long)]
    pub profile: Option<String>,

    /// Filter expression for list_users (cannot be used with --group-name).
    #[arg(long, conflicts_with = "group_name")]
    pub filter_expression: Option<String>,

    /// Cognito group to export (cannot be used with --filter-expression).
    #[arg(long)]
    pub group_name: Option<String>,

    /// Starting pagination token (for resuming interrupted exports).
    #[arg(long)]
    pub starting_token: Option<String>,

    /// CSV output file.
    #[arg(long, short = 'f', default_value = "CognitoUsers.csv", value_name = "FILE")]
    pub file_name: PathBuf,

    /// Records per page (service maximum is 60).
    #[arg(long, default_value_t = 60)]
    pub page_size: i32,

    /// Max number of records to export (0 for all).
    #[arg(long, default_value_t = 0)]
    pub num_records: u64,

    /// Maximum number of retry attempts for rate-limited requests.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base delay in seconds for exponential backoff.
    #[arg(long)]
    pub base_delay: Option<f64>,

    /// S3 bucket to upload the CSV to after the export.
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// S3 object key for the upload (defaults to the file name).
    #[arg(long, requires = "s3_bucket")]
    pub s3_key: Option<String>,

    /// Gzip the CSV before uploading.
    #[arg(long, requires = "s3_bucket")]
    pub compress: bool,

    /// Resume from the last saved checkpoint for this output file.
    #[arg(long)]
    pub resume: bool,
}

#[derive(Debug, Args)]
pub struct DedupeArgs {
    /// Input CSV file to deduplicate.
    pub input: PathBuf,

    /// Output CSV file (defaults to `<input>_deduplicated.csv`).
    #[arg(long, short = 'o')]
    pub output_file: Option<PathBuf>,

    /// Columns to use as unique keys.
    #[arg(long, short = 'k', num_args = 1.., default_values_t = [String::from("sub")])]
    pub keys: Vec<String>,

    /// Keep the last occurrence of duplicates instead of the first.
    #[arg(long)]
    pub keep_last: bool,

    /// Only report duplicates without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliCommand {
    /// Parse, dispatch, and return the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        logging::init_logging(&cli.log_level);

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Export(args) => run_export(&cfg, args).await,
            CliCommand::Dedupe(args) => run_dedupe(args),
        }
    }
}

#[cfg(test)]
mod tests;
