//! Core of the staging-to-OHDM migration engine.
//!
//! The crate models staging entities, splits staging tables into primary-key
//! windows, and drives the scan pipeline that assembles rows into entities,
//! resolves relation membership and hands consistent entities to an
//! [`Importer`]. Storage is reached only through the [`StagingStore`] trait;
//! the SQLite adapter lives in `ohdm-staging`.
//!
//! Libraries in the workspace log through the `log` facade. Binaries decide
//! where records go.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod chunk;
mod entity;
mod importer;
mod migrate;
mod staging;
mod stats;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use chunk::{
    ChunkPlanner, ChunkWindow, DEFAULT_CHUNK_SIZE, DEFAULT_SEQUENTIAL_TAIL, KeyRange, PlanOptions,
    Windows, WorkItem, WorkTarget,
};
pub use entity::{
    ChangeFlags, Entity, EntityHeader, EntityKind, Node, OsmId, OsmIdError, Relation,
    RelationMember, UNTYPED_CLASS_CODE, UnknownEntityKind, Way,
};
pub use importer::{ImportError, Importer};
pub use migrate::{
    AssembleError, BatchScanner, KindOutcome, RELATION_RESOLUTION_DEPTH, Resolution, RowError,
    ScanError, ScanOptions, assemble, assemble_node, resolve,
};
pub use staging::{MembershipRow, NAME_MARKER, RowFilter, StagingRow, StagingStore, StoreError};
pub use stats::{
    PerKind, Progress, ProgressCadence, StatsSnapshot, StatsTracker, group_digits,
};
