//! Facade crate for the staging-to-OHDM migration engine.
//!
//! This crate re-exports the core domain types and exposes the SQLite staging
//! store behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use ohdm_core::{
    BatchScanner, ChunkPlanner, ChunkWindow, Entity, EntityKind, ImportError, Importer, KeyRange,
    KindOutcome, Node, OsmId, PlanOptions, Relation, RowFilter, ScanError, ScanOptions,
    StagingStore, StatsSnapshot, StatsTracker, StoreError, Way, WorkItem, WorkTarget,
};

#[cfg(feature = "store-sqlite")]
pub use ohdm_staging::{
    SqliteStagingStore, StagingOpenError, StagingSchemaError, TableNames, initialise_schema,
};
