//! SQLite adapter for the intermediate staging store.
//!
//! [`SqliteStagingStore`] implements [`ohdm_core::StagingStore`] over the
//! `nodes`, `ways`, `relations`, `waynodes` and `relationmember` tables.
//! [`initialise_schema`] creates those tables for fresh databases and tests.
//! Tables may live in an attached database; see [`TableNames`].

#![forbid(unsafe_code)]

mod columns;
mod schema;
mod store;
mod tables;

pub use schema::{StagingSchemaError, initialise_schema, initialise_schema_with};
pub use store::{SqliteStagingStore, StagingOpenError};
pub use tables::{
    COMMON_COLUMNS, KindTable, RELATION_MEMBER_TABLE, TableNames, WAY_NODES_TABLE,
};
