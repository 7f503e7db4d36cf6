//! Error types emitted by the `ohdm` CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ohdm_core::{EntityKind, ScanError, StoreError};
use ohdm_staging::StagingOpenError;
use thiserror::Error;

/// Errors emitted by the `ohdm` CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable name.
        env: &'static str,
    },
    /// A numeric option is out of range.
    #[error("invalid --{field}: {reason}")]
    InvalidArgument {
        /// Flag name.
        field: &'static str,
        /// What is wrong with the value.
        reason: &'static str,
    },
    /// The staging database does not exist.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The staging database path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The staging database path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the staging database failed.
    #[error(transparent)]
    OpenStaging(#[from] Box<StagingOpenError>),
    /// Probing a staging table while planning failed.
    #[error("failed to probe {} table: {source}", .kind.plural())]
    Probe {
        /// Kind whose table was probed.
        kind: EntityKind,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
    /// A scan aborted.
    #[error(transparent)]
    Scan(#[from] Box<ScanError>),
    /// Creating the plan output file failed.
    #[error("failed to create output file {path:?}: {source}")]
    CreateOutput {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Serializing a work item failed.
    #[error("failed to serialize work item: {0}")]
    SerializeWorkItem(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// The log formatter could not be installed.
    #[error("failed to install logger: {0}")]
    InstallLogger(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<StagingOpenError> for CliError {
    fn from(source: StagingOpenError) -> Self {
        Self::OpenStaging(Box::new(source))
    }
}

impl From<ScanError> for CliError {
    fn from(source: ScanError) -> Self {
        Self::Scan(Box::new(source))
    }
}
