//! Command-line interface for the staging-to-OHDM migration tools.
//!
//! `ohdm plan` probes the staging tables and prints the work items a
//! dispatcher hands to workers. `ohdm scan` runs the scan pipeline over a
//! staging database with a dry-run importer and prints the final statistics.
#![forbid(unsafe_code)]

use std::{ffi::OsString, io::Write, num::NonZeroU64};

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use ohdm_core::DEFAULT_CHUNK_SIZE;

mod error;
mod logging;
mod plan;
mod scan;

pub use error::CliError;
pub use logging::init_logging;
pub use scan::DryRunImporter;

use plan::{PlanArgs, run_plan_with};
use scan::{ScanArgs, run_scan_with};

pub(crate) const ARG_STAGING_DB: &str = "staging-db";
pub(crate) const ARG_CHUNK_SIZE: &str = "chunk-size";
pub(crate) const ARG_PARALLELISM: &str = "parallelism";
pub(crate) const ARG_SEQUENTIAL_TAIL: &str = "sequential-tail";
pub(crate) const ARG_DESTINATION: &str = "destination";
pub(crate) const ARG_LOG_PREFIX: &str = "log-prefix";
pub(crate) const ARG_NICE: &str = "nice";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_KIND: &str = "kind";
pub(crate) const ARG_FROM: &str = "from";
pub(crate) const ARG_TO: &str = "to";
pub(crate) const ARG_NAMED_ONLY: &str = "named-only";
pub(crate) const ARG_KEEP_GOING: &str = "keep-going";
pub(crate) const ENV_PLAN_STAGING_DB: &str = "OHDM_CMDS_PLAN_STAGING_DB";
pub(crate) const ENV_SCAN_STAGING_DB: &str = "OHDM_CMDS_SCAN_STAGING_DB";

/// Run the CLI with the current process arguments, writing to stdout.
///
/// Help, version and usage errors print through clap and exit the process.
///
/// # Errors
/// Returns [`CliError`] when parsing, configuration or the command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().unwrap_or_else(|err| err.exit());
    let mut stdout = std::io::stdout().lock();
    dispatch(cli, &mut stdout)
}

/// Run the CLI with explicit arguments and output.
///
/// # Errors
/// Returns [`CliError`] when parsing, configuration or the command fails.
pub fn run_from<I, T>(args: I, writer: &mut dyn Write) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(CliError::ArgumentParsing)?;
    dispatch(cli, writer)
}

fn dispatch(cli: Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    match cli.command {
        Command::Plan(args) => run_plan_with(args, writer),
        Command::Scan(args) => run_scan_with(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ohdm",
    about = "Migrate staging geodata into the OHDM schema",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split the staging tables into work items for parallel workers.
    Plan(PlanArgs),
    /// Scan staging tables through the migration pipeline.
    Scan(ScanArgs),
}

/// Chunk size from an optional flag, defaulting to [`DEFAULT_CHUNK_SIZE`].
pub(crate) fn chunk_size(value: Option<u64>) -> Result<NonZeroU64, CliError> {
    value.map_or(Ok(DEFAULT_CHUNK_SIZE), |rows| {
        NonZeroU64::new(rows).ok_or(CliError::InvalidArgument {
            field: ARG_CHUNK_SIZE,
            reason: "must be at least 1",
        })
    })
}

/// Require `path` to name an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match ohdm_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests;
