//! Unit tests for the SQLite staging store.

mod behaviour;

use std::num::NonZeroU64;

use ohdm_core::{
    BatchScanner, ChunkWindow, EntityKind, KeyRange, OsmId, RowFilter, ScanOptions, StagingStore,
    StatsTracker, assemble, test_support::RecordingImporter,
};
use rstest::{fixture, rstest};
use rusqlite::Connection;
use tempfile::TempDir;

use super::{SqliteStagingStore, StagingOpenError};
use crate::initialise_schema;

pub(super) fn insert_node(
    connection: &Connection,
    id: i64,
    osm_id: &str,
    class_code: Option<i64>,
    tags: &str,
) {
    connection
        .execute(
            "INSERT INTO nodes (id, osm_id, classcode, serializedtags, valid, longitude, latitude)
             VALUES (?1, ?2, ?3, ?4, 1, '13.40', '52.50')",
            (id, osm_id, class_code, tags),
        )
        .expect("insert node");
}

pub(super) fn insert_way(connection: &Connection, id: i64, osm_id: &str, nodes: &[&str]) {
    connection
        .execute(
            "INSERT INTO ways (id, osm_id, classcode, serializedtags, valid)
             VALUES (?1, ?2, 3, '', 1)",
            (id, osm_id),
        )
        .expect("insert way");
    for node in nodes {
        connection
            .execute(
                "INSERT INTO waynodes (way_id, node_id) VALUES (?1, ?2)",
                (osm_id, node),
            )
            .expect("insert way node");
    }
}

pub(super) fn staging_connection() -> Connection {
    let mut connection = Connection::open_in_memory().expect("open in-memory database");
    initialise_schema(&mut connection).expect("create staging schema");
    connection
}

fn count(connection: &Connection, sql: &str) -> i64 {
    connection
        .query_row(sql, [], |row| row.get(0))
        .expect("count rows")
}

fn id(raw: &str) -> OsmId {
    OsmId::parse(raw).expect("valid osm id")
}

#[fixture]
fn store() -> SqliteStagingStore {
    let connection = staging_connection();
    insert_node(&connection, 3, "103", Some(1), "");
    insert_node(&connection, 5, "105", Some(-1), "");
    insert_node(&connection, 8, "108", Some(2), "004name0004Mitte");
    insert_node(&connection, 9, "109", None, "");
    SqliteStagingStore::from_connection(connection)
}

#[rstest]
fn probes_key_range(mut store: SqliteStagingStore) {
    assert_eq!(
        store.probe(EntityKind::Node).expect("probe nodes"),
        KeyRange::new(4, 3, 9)
    );
    assert_eq!(
        store.probe(EntityKind::Relation).expect("probe relations"),
        KeyRange::EMPTY
    );
}

#[rstest]
fn fetch_skips_untyped_rows_and_keeps_unclassified(mut store: SqliteStagingStore) {
    let rows = store
        .fetch_window(
            EntityKind::Node,
            &ChunkWindow::new(2, 9),
            &RowFilter::default(),
        )
        .expect("fetch window");
    let keys: Vec<i128> = rows.iter().map(|row| row.key).collect();
    assert_eq!(keys, [3, 8, 9]);

    let unclassified = rows.last().expect("row without classcode");
    assert_eq!(unclassified.class_code, None);
    assert!(assemble(unclassified, EntityKind::Node).is_err());
}

#[rstest]
fn fetch_respects_half_open_bounds(mut store: SqliteStagingStore) {
    let rows = store
        .fetch_window(
            EntityKind::Node,
            &ChunkWindow::new(3, 8),
            &RowFilter::default(),
        )
        .expect("fetch window");
    assert_eq!(rows.iter().map(|row| row.key).collect::<Vec<_>>(), [8]);
}

#[rstest]
fn named_filter_matches_marker(mut store: SqliteStagingStore) {
    let filter = RowFilter {
        named_only: true,
        ..RowFilter::default()
    };
    let rows = store
        .fetch_window(EntityKind::Node, &ChunkWindow::new(0, 100), &filter)
        .expect("fetch named window");
    let ids: Vec<_> = rows.iter().filter_map(|row| row.osm_id.as_deref()).collect();
    assert_eq!(ids, ["108"]);
}

#[rstest]
fn way_nodes_follow_storage_order() {
    let connection = staging_connection();
    insert_node(&connection, 1, "11", Some(1), "");
    insert_node(&connection, 2, "12", Some(1), "");
    insert_way(&connection, 1, "21", &["12", "99", "11"]);
    let mut store = SqliteStagingStore::from_connection(connection);

    let nodes = store.way_nodes(&id("21")).expect("read way nodes");
    let ids: Vec<_> = nodes.iter().filter_map(|row| row.osm_id.as_deref()).collect();
    assert_eq!(ids, ["12", "11"], "missing node 99 is skipped");
    assert!(nodes.iter().all(|row| row.latitude.is_some()));
}

#[rstest]
fn relation_members_keep_insertion_order() {
    let connection = staging_connection();
    connection
        .execute_batch(
            "INSERT INTO relationmember (relation_id, role, node_id, way_id, member_rel_id)
             VALUES ('31', 'outer', NULL, '21', NULL),
                    ('31', '', '11', NULL, NULL),
                    ('32', 'inner', NULL, NULL, '31');",
        )
        .expect("insert members");
    let mut store = SqliteStagingStore::from_connection(connection);

    let members = store.relation_members(&id("31")).expect("read members");
    let targets: Vec<_> = members.iter().filter_map(|row| row.target()).collect();
    assert_eq!(
        targets,
        [(EntityKind::Way, "21"), (EntityKind::Node, "11")]
    );
    assert_eq!(members.first().and_then(|row| row.role.as_deref()), Some("outer"));
}

#[rstest]
fn find_by_osm_id_returns_first_match(mut store: SqliteStagingStore) {
    let row = store
        .find_by_osm_id(EntityKind::Node, "108")
        .expect("look up node");
    assert_eq!(row.map(|found| found.key), Some(8));
    assert_eq!(
        store
            .find_by_osm_id(EntityKind::Way, "108")
            .expect("look up way"),
        None
    );
}

#[rstest]
fn write_back_coalesces_and_is_idempotent(mut store: SqliteStagingStore) {
    let node = id("103");
    store
        .write_back(EntityKind::Node, &node, Some("obj-1"), None)
        .expect("write object id");
    store
        .write_back(EntityKind::Node, &node, None, Some("geom-1"))
        .expect("write geometry id");
    store
        .write_back(EntityKind::Node, &node, None, None)
        .expect("no-op write");
    store
        .write_back(EntityKind::Node, &node, None, Some("geom-1"))
        .expect("repeat write");

    let row = store
        .find_by_osm_id(EntityKind::Node, "103")
        .expect("look up node")
        .expect("node present");
    assert_eq!(row.ohdm_object_id.as_deref(), Some("obj-1"));
    assert_eq!(row.ohdm_geom_id.as_deref(), Some("geom-1"));
}

#[rstest]
fn remove_deletes_membership_then_row() {
    let connection = staging_connection();
    insert_node(&connection, 1, "11", Some(1), "");
    insert_node(&connection, 2, "12", Some(1), "");
    insert_way(&connection, 1, "21", &["11", "12"]);
    insert_way(&connection, 2, "22", &["12", "11"]);
    let mut store = SqliteStagingStore::from_connection(connection);

    let row = store
        .find_by_osm_id(EntityKind::Way, "21")
        .expect("look up way")
        .expect("way present");
    let way = assemble(&row, EntityKind::Way).expect("assemble way");
    store.remove(&way).expect("remove way");

    let connection = store.connection();
    assert_eq!(count(connection, "SELECT count(*) FROM ways"), 1);
    assert_eq!(
        count(connection, "SELECT count(*) FROM waynodes WHERE way_id = '21'"),
        0
    );
    assert_eq!(
        count(connection, "SELECT count(*) FROM waynodes WHERE way_id = '22'"),
        2
    );
}

#[rstest]
fn open_requires_existing_database() {
    let dir = TempDir::new().expect("create temp dir");
    let missing = dir.path().join("missing.db");
    let result = SqliteStagingStore::open(&missing);
    assert!(matches!(result, Err(StagingOpenError::Open { path, .. }) if path == missing));
    assert!(!missing.exists());
}

#[rstest]
fn reads_tables_from_attached_schema() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("intermediate.db");
    {
        let mut connection = Connection::open(&path).expect("create staging file");
        initialise_schema(&mut connection).expect("create staging schema");
        insert_node(&connection, 4, "104", Some(1), "");
    }
    let main = Connection::open_in_memory().expect("open in-memory database");
    let mut store = SqliteStagingStore::from_connection(main)
        .attach(&path, "intermediate")
        .expect("attach staging schema");

    assert_eq!(store.tables().schema(), Some("intermediate"));
    assert_eq!(
        store.probe(EntityKind::Node).expect("probe attached nodes"),
        KeyRange::new(1, 4, 4)
    );
}

#[rstest]
fn scanner_migrates_from_sqlite() {
    let connection = staging_connection();
    insert_node(&connection, 1, "11", Some(1), "");
    insert_node(&connection, 2, "12", Some(1), "");
    insert_way(&connection, 1, "21", &["11", "12"]);
    insert_way(&connection, 2, "22", &["11"]);
    let store = SqliteStagingStore::from_connection(connection);
    let options = ScanOptions {
        chunk_size: NonZeroU64::new(1).expect("non-zero chunk size"),
        ..ScanOptions::default()
    };
    let mut stats = StatsTracker::new(options.chunk_size);
    let mut scanner = BatchScanner::new(store, RecordingImporter::default(), options);

    let outcomes = scanner.migrate(&[EntityKind::Node, EntityKind::Way], false, &mut stats);
    assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.checked.ways, 2);
    assert_eq!(snapshot.imported.ways, 1);
    assert_eq!(scanner.importer().imported_ids(EntityKind::Way), ["21"]);
}
