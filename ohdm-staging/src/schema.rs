//! Staging table creation.

use ohdm_core::EntityKind;
use rusqlite::{Connection, Error as SqliteError, Transaction};
use thiserror::Error;

use crate::tables::{KindTable, RELATION_MEMBER_TABLE, TableNames, WAY_NODES_TABLE};

/// Create the staging tables inside the main database.
///
/// Existing tables are left untouched, so the call is safe on databases
/// produced by an external importer.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use ohdm_staging::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create staging schema");
///
/// let tables: i64 = conn
///     .query_row(
///         "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
///         [],
///         |row| row.get(0),
///     )
///     .expect("count tables");
/// assert_eq!(tables, 5);
/// ```
///
/// # Errors
/// Returns [`StagingSchemaError::Migration`] naming the step that failed.
pub fn initialise_schema(connection: &mut Connection) -> Result<(), StagingSchemaError> {
    initialise_schema_with(connection, &TableNames::main())
}

/// Create the staging tables inside the schema described by `tables`.
///
/// # Errors
/// Returns [`StagingSchemaError::Migration`] naming the step that failed.
pub fn initialise_schema_with(
    connection: &mut Connection,
    tables: &TableNames,
) -> Result<(), StagingSchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| StagingSchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_entity_tables(&transaction, tables)?;
    create_membership_tables(&transaction, tables)?;
    create_indexes(&transaction, tables)?;

    transaction
        .commit()
        .map_err(|source| StagingSchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_entity_tables(
    transaction: &Transaction<'_>,
    tables: &TableNames,
) -> Result<(), StagingSchemaError> {
    for kind in EntityKind::ALL {
        let table = KindTable::for_kind(kind);
        let kind_columns: String = table
            .kind_columns
            .iter()
            .map(|column| format!(",\n            \"{column}\" TEXT"))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {name} (
            \"{key}\" INTEGER PRIMARY KEY,
            osm_id TEXT,
            classcode INTEGER,
            serializedtags TEXT,
            ohdm_object_id TEXT,
            ohdm_geom_id TEXT,
            valid INTEGER,
            \"new\" INTEGER,
            changed INTEGER,
            deleted INTEGER,
            has_name INTEGER,
            tstamp TEXT{kind_columns}
        )",
            name = tables.qualify(table.table),
            key = table.key_column,
        );
        run_migration_step(transaction, create_step(kind), &sql)?;
    }
    Ok(())
}

const fn create_step(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Node => "create nodes",
        EntityKind::Way => "create ways",
        EntityKind::Relation => "create relations",
    }
}

fn create_membership_tables(
    transaction: &Transaction<'_>,
    tables: &TableNames,
) -> Result<(), StagingSchemaError> {
    run_migration_step(
        transaction,
        "create waynodes",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
            way_id TEXT NOT NULL,
            node_id TEXT NOT NULL
        )",
            tables.qualify(WAY_NODES_TABLE)
        ),
    )?;
    run_migration_step(
        transaction,
        "create relationmember",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
            relation_id TEXT NOT NULL,
            role TEXT,
            node_id TEXT,
            way_id TEXT,
            member_rel_id TEXT
        )",
            tables.qualify(RELATION_MEMBER_TABLE)
        ),
    )
}

fn create_indexes(
    transaction: &Transaction<'_>,
    tables: &TableNames,
) -> Result<(), StagingSchemaError> {
    for kind in EntityKind::ALL {
        let table = KindTable::for_kind(kind).table;
        run_migration_step(
            transaction,
            index_step(kind),
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON \"{table}\"(osm_id)",
                tables.qualify(&format!("idx_{table}_osm_id"))
            ),
        )?;
    }
    run_migration_step(
        transaction,
        "index waynodes",
        &format!(
            "CREATE INDEX IF NOT EXISTS {} ON \"{WAY_NODES_TABLE}\"(way_id)",
            tables.qualify("idx_waynodes_way_id")
        ),
    )?;
    run_migration_step(
        transaction,
        "index relationmember",
        &format!(
            "CREATE INDEX IF NOT EXISTS {} ON \"{RELATION_MEMBER_TABLE}\"(relation_id)",
            tables.qualify("idx_relationmember_relation_id")
        ),
    )
}

const fn index_step(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Node => "index nodes",
        EntityKind::Way => "index ways",
        EntityKind::Relation => "index relations",
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), StagingSchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| StagingSchemaError::Migration { step, source })
}

/// Errors raised when creating the staging tables.
#[derive(Debug, Error)]
pub enum StagingSchemaError {
    /// A DDL statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Step that failed.
        step: &'static str,
        /// Underlying SQLite error.
        #[source]
        source: SqliteError,
    },
}
