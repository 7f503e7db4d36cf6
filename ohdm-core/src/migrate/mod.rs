//! The staging-to-destination migration pipeline.
//!
//! [`BatchScanner`] walks a staging table window by window, turns each row
//! into an [`Entity`](crate::Entity) with [`assemble`], resolves relation
//! membership with [`resolve`], and hands consistent entities to an
//! [`Importer`](crate::Importer). Row-level failures are logged and folded
//! into statistics; only failures that stop the cursor reach the caller.

use thiserror::Error;

use crate::{ChunkWindow, EntityKind, ImportError, OsmId, StoreError};

mod assembler;
mod resolver;
mod scanner;

pub use assembler::{AssembleError, assemble, assemble_node};
pub use resolver::{RELATION_RESOLUTION_DEPTH, Resolution, resolve};
pub use scanner::{BatchScanner, KindOutcome, ScanOptions};

/// Failure that aborts the scan of one kind.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The table could not be probed for its key range.
    #[error("failed to probe {kind} table: {source}")]
    Probe {
        /// Kind being scanned.
        kind: EntityKind,
        /// Store failure.
        #[source]
        source: StoreError,
    },
    /// A window could not be read, so the cursor cannot advance.
    #[error("failed to fetch {kind} window {window}: {source}")]
    Fetch {
        /// Kind being scanned.
        kind: EntityKind,
        /// Window that failed.
        window: ChunkWindow,
        /// Store failure.
        #[source]
        source: StoreError,
    },
}

impl ScanError {
    /// Kind whose scan was aborted.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Probe { kind, .. } | Self::Fetch { kind, .. } => *kind,
        }
    }
}

/// Failure confined to a single staging row.
#[derive(Debug, Error)]
pub enum RowError {
    /// The row could not be assembled.
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    /// A follow-up staging query failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The importer rejected the call with an error.
    #[error("importer failed during {operation}: {source}")]
    Import {
        /// Importer operation that failed.
        operation: &'static str,
        /// Importer error.
        #[source]
        source: ImportError,
    },
    /// A membership row names neither a node, a way nor a relation.
    #[error("relation {relation} has a membership row without a target")]
    MembershipWithoutTarget {
        /// Relation being resolved.
        relation: OsmId,
    },
}

impl RowError {
    pub(crate) fn import(operation: &'static str) -> impl FnOnce(ImportError) -> Self {
        move |source| Self::Import { operation, source }
    }
}
