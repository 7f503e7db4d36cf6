//! Entry point for the `ohdm` command-line interface.
#![forbid(unsafe_code)]

use eyre::WrapErr;

fn main() -> eyre::Result<()> {
    ohdm_cli::init_logging().wrap_err("failed to set up logging")?;
    ohdm_cli::run().wrap_err("ohdm failed")
}
