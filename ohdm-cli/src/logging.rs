//! Log output for the binary.

use tracing_subscriber::EnvFilter;

use crate::CliError;

const DEFAULT_FILTER: &str = "info";

/// Install a formatter on stderr filtered by `RUST_LOG` (default `info`).
///
/// Records emitted through the `log` facade by the library crates are
/// forwarded to the same formatter.
///
/// # Errors
/// Returns [`CliError::InstallLogger`] when a global logger is already set.
pub fn init_logging() -> Result<(), CliError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(CliError::InstallLogger)
}
