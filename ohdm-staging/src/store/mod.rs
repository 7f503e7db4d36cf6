//! [`StagingStore`] implementation over a SQLite connection.

use std::path::{Path, PathBuf};

use log::debug;
use ohdm_core::{
    ChunkWindow, Entity, EntityKind, KeyRange, MembershipRow, OsmId, PerKind, RowFilter,
    StagingRow, StagingStore, StoreError, UNTYPED_CLASS_CODE,
};
use rusqlite::{Connection, Error as SqliteError, OpenFlags, Params};
use thiserror::Error;

use crate::{
    columns::{ColumnMap, read_membership},
    tables::{KindTable, RELATION_MEMBER_TABLE, TableNames, WAY_NODES_TABLE},
};

/// Errors raised while opening a staging database.
#[derive(Debug, Error)]
pub enum StagingOpenError {
    /// The database file could not be opened.
    #[error("failed to open staging database at {path}")]
    Open {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying SQLite error.
        #[source]
        source: SqliteError,
    },
    /// A schema name is not a plain identifier.
    #[error("invalid staging schema name '{name}'")]
    InvalidSchema {
        /// Rejected name.
        name: String,
    },
    /// Attaching a database under a schema name failed.
    #[error("failed to attach {path} as schema '{name}'")]
    Attach {
        /// Attached database path.
        path: PathBuf,
        /// Schema name.
        name: String,
        /// Underlying SQLite error.
        #[source]
        source: SqliteError,
    },
}

#[derive(Debug, Clone)]
struct KindQueries {
    probe: String,
    fetch: String,
    fetch_named: String,
    find: String,
    write_back: String,
    delete: String,
}

impl KindQueries {
    fn new(tables: &TableNames, kind: EntityKind) -> Self {
        let descriptor = KindTable::for_kind(kind);
        let table = tables.entity_table(kind);
        let key = descriptor.key_column;
        let columns = descriptor.select_list(None);
        let window = format!(
            "SELECT {columns} FROM {table}
             WHERE \"{key}\" >= ?1 AND \"{key}\" <= ?2
               AND (classcode IS NULL OR trim(CAST(classcode AS TEXT)) <> '{UNTYPED_CLASS_CODE}')"
        );
        Self {
            probe: format!("SELECT count(*), min(\"{key}\"), max(\"{key}\") FROM {table}"),
            fetch: format!("{window}\n             ORDER BY \"{key}\""),
            fetch_named: format!(
                "{window}\n               AND instr(serializedtags, ?3) > 0\n             ORDER BY \"{key}\""
            ),
            find: format!("SELECT {columns} FROM {table} WHERE osm_id = ?1 ORDER BY \"{key}\" LIMIT 1"),
            write_back: format!(
                "UPDATE {table}
                 SET ohdm_object_id = COALESCE(?1, ohdm_object_id),
                     ohdm_geom_id = COALESCE(?2, ohdm_geom_id)
                 WHERE osm_id = ?3"
            ),
            delete: format!("DELETE FROM {table} WHERE osm_id = ?1"),
        }
    }
}

#[derive(Debug, Clone)]
struct Queries {
    kinds: PerKind<KindQueries>,
    way_nodes: String,
    members: String,
    delete_way_nodes: String,
    delete_members: String,
}

impl Queries {
    fn new(tables: &TableNames) -> Self {
        let way_nodes = tables.qualify(WAY_NODES_TABLE);
        let members = tables.qualify(RELATION_MEMBER_TABLE);
        let nodes = tables.entity_table(EntityKind::Node);
        let node_columns = KindTable::for_kind(EntityKind::Node).select_list(Some("n"));
        Self {
            kinds: PerKind {
                nodes: KindQueries::new(tables, EntityKind::Node),
                ways: KindQueries::new(tables, EntityKind::Way),
                relations: KindQueries::new(tables, EntityKind::Relation),
            },
            way_nodes: format!(
                "SELECT {node_columns} FROM {way_nodes} AS w
                 JOIN {nodes} AS n ON n.osm_id = w.node_id
                 WHERE w.way_id = ?1
                 ORDER BY w.rowid"
            ),
            members: format!(
                "SELECT role, node_id, way_id, member_rel_id FROM {members}
                 WHERE relation_id = ?1
                 ORDER BY rowid"
            ),
            delete_way_nodes: format!("DELETE FROM {way_nodes} WHERE way_id = ?1"),
            delete_members: format!("DELETE FROM {members} WHERE relation_id = ?1"),
        }
    }
}

/// Staging store backed by SQLite.
///
/// Statements are prepared through the connection's statement cache, so
/// repeated window and membership queries are compiled once.
#[derive(Debug)]
pub struct SqliteStagingStore {
    connection: Connection,
    tables: TableNames,
    queries: Queries,
}

impl SqliteStagingStore {
    /// Open an existing staging database for reading and write-back.
    ///
    /// # Errors
    /// Returns [`StagingOpenError::Open`] when the file is missing or cannot
    /// be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StagingOpenError> {
        let path_ref = path.as_ref();
        let connection = Connection::open_with_flags(
            path_ref,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StagingOpenError::Open {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Ok(Self::from_connection(connection))
    }

    /// Wrap an open connection whose staging tables live in the main schema.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        let tables = TableNames::main();
        let queries = Queries::new(&tables);
        Self {
            connection,
            tables,
            queries,
        }
    }

    /// Read the staging tables from the already attached schema `name`.
    ///
    /// # Errors
    /// Returns [`StagingOpenError::InvalidSchema`] for names that are not
    /// plain identifiers.
    pub fn with_schema(mut self, name: &str) -> Result<Self, StagingOpenError> {
        self.tables = TableNames::in_schema(name)?;
        self.queries = Queries::new(&self.tables);
        Ok(self)
    }

    /// Attach the database at `path` as schema `name` and read the staging
    /// tables from it.
    ///
    /// # Errors
    /// Returns [`StagingOpenError::InvalidSchema`] for unsafe names and
    /// [`StagingOpenError::Attach`] when SQLite rejects the attachment.
    pub fn attach(self, path: impl AsRef<Path>, name: &str) -> Result<Self, StagingOpenError> {
        let tables = TableNames::in_schema(name)?;
        let path_ref = path.as_ref();
        let location = path_ref.to_string_lossy();
        self.connection
            .execute(&format!("ATTACH DATABASE ?1 AS \"{name}\""), [location.as_ref()])
            .map_err(|source| StagingOpenError::Attach {
                path: path_ref.to_path_buf(),
                name: name.to_owned(),
                source,
            })?;
        debug!("attached {} as staging schema {name}", path_ref.display());
        let queries = Queries::new(&tables);
        Ok(Self {
            tables,
            queries,
            ..self
        })
    }

    /// Table naming in effect.
    #[must_use]
    pub const fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Borrow the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Mutably borrow the underlying connection.
    pub const fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Release the underlying connection.
    #[must_use]
    pub fn into_connection(self) -> Connection {
        self.connection
    }

    fn query_rows<P: Params>(
        &self,
        sql: &str,
        key_column: &str,
        params: P,
        operation: &'static str,
    ) -> Result<Vec<StagingRow>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(sql)
            .map_err(store_error(operation))?;
        let columns = ColumnMap::new(key_column, &statement.column_names());
        let rows = statement
            .query_map(params, |row| columns.read(row))
            .map_err(store_error(operation))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(store_error(operation))
    }
}

fn store_error(operation: &'static str) -> impl FnOnce(SqliteError) -> StoreError {
    move |source| StoreError::new(operation, source)
}

/// Clamp a key to SQLite's integer range.
fn sql_key(key: i128) -> i64 {
    i64::try_from(key).unwrap_or(if key < 0 { i64::MIN } else { i64::MAX })
}

impl StagingStore for SqliteStagingStore {
    fn probe(&mut self, kind: EntityKind) -> Result<KeyRange, StoreError> {
        let (count, min, max) = self
            .connection
            .prepare_cached(&self.queries.kinds.get(kind).probe)
            .and_then(|mut statement| {
                statement.query_row([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                })
            })
            .map_err(store_error("probe table"))?;
        let range = match (min, max) {
            (Some(low), Some(high)) => KeyRange::new(
                u64::try_from(count).unwrap_or_default(),
                i128::from(low),
                i128::from(high),
            ),
            _ => KeyRange::EMPTY,
        };
        debug!(
            "probed {}: {} rows, keys {}..={}",
            self.tables.entity_table(kind),
            range.count,
            range.min,
            range.max
        );
        Ok(range)
    }

    fn fetch_window(
        &mut self,
        kind: EntityKind,
        window: &ChunkWindow,
        filter: &RowFilter,
    ) -> Result<Vec<StagingRow>, StoreError> {
        if window.first_key() > window.last_key() {
            return Ok(Vec::new());
        }
        let queries = self.queries.kinds.get(kind);
        let key_column = KindTable::for_kind(kind).key_column;
        let first = sql_key(window.first_key());
        let last = sql_key(window.last_key());
        let rows = if filter.named_only {
            self.query_rows(
                &queries.fetch_named,
                key_column,
                (first, last, filter.name_marker.as_str()),
                "fetch window",
            )?
        } else {
            self.query_rows(&queries.fetch, key_column, (first, last), "fetch window")?
        };
        debug!("fetched {} {} in window {window}", rows.len(), kind.plural());
        Ok(rows)
    }

    fn way_nodes(&mut self, way_id: &OsmId) -> Result<Vec<StagingRow>, StoreError> {
        let key_column = KindTable::for_kind(EntityKind::Node).key_column;
        self.query_rows(
            &self.queries.way_nodes,
            key_column,
            [way_id.as_str()],
            "read way nodes",
        )
    }

    fn relation_members(&mut self, relation_id: &OsmId) -> Result<Vec<MembershipRow>, StoreError> {
        let operation = "read relation members";
        let mut statement = self
            .connection
            .prepare_cached(&self.queries.members)
            .map_err(store_error(operation))?;
        let rows = statement
            .query_map([relation_id.as_str()], read_membership)
            .map_err(store_error(operation))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(store_error(operation))
    }

    fn find_by_osm_id(
        &mut self,
        kind: EntityKind,
        osm_id: &str,
    ) -> Result<Option<StagingRow>, StoreError> {
        let key_column = KindTable::for_kind(kind).key_column;
        let rows = self.query_rows(
            &self.queries.kinds.get(kind).find,
            key_column,
            [osm_id],
            "look up row",
        )?;
        Ok(rows.into_iter().next())
    }

    fn write_back(
        &mut self,
        kind: EntityKind,
        osm_id: &OsmId,
        object_id: Option<&str>,
        geom_id: Option<&str>,
    ) -> Result<(), StoreError> {
        if object_id.is_none() && geom_id.is_none() {
            return Ok(());
        }
        let operation = "write back destination ids";
        let updated = self
            .connection
            .prepare_cached(&self.queries.kinds.get(kind).write_back)
            .and_then(|mut statement| statement.execute((object_id, geom_id, osm_id.as_str())))
            .map_err(store_error(operation))?;
        if updated == 0 {
            debug!("no {kind} row with osm_id {osm_id} to update");
        }
        Ok(())
    }

    fn remove(&mut self, entity: &Entity) -> Result<(), StoreError> {
        let id = entity.osm_id().as_str();
        let membership = match entity {
            Entity::Node(_) => None,
            Entity::Way(_) => Some(self.queries.delete_way_nodes.as_str()),
            Entity::Relation(_) => Some(self.queries.delete_members.as_str()),
        };
        let delete_row = self.queries.kinds.get(entity.kind()).delete.as_str();

        let transaction = self
            .connection
            .transaction()
            .map_err(store_error("begin removal"))?;
        if let Some(sql) = membership {
            transaction
                .prepare_cached(sql)
                .and_then(|mut statement| statement.execute([id]))
                .map_err(store_error("delete membership rows"))?;
        }
        transaction
            .prepare_cached(delete_row)
            .and_then(|mut statement| statement.execute([id]))
            .map_err(store_error("delete staging row"))?;
        transaction.commit().map_err(store_error("commit removal"))
    }
}

#[cfg(test)]
mod tests;
