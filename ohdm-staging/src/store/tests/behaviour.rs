//! Behavioural tests for the SQLite staging store using rstest-bdd.

use std::cell::RefCell;

use ohdm_core::{ChunkWindow, EntityKind, OsmId, RowFilter, StagingRow, StagingStore};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::{insert_node, staging_connection};
use crate::SqliteStagingStore;

#[fixture]
pub fn store() -> RefCell<Option<SqliteStagingStore>> {
    RefCell::new(None)
}

#[fixture]
pub fn fetched() -> RefCell<Option<Vec<StagingRow>>> {
    RefCell::new(None)
}

fn with_store<T>(
    store: &RefCell<Option<SqliteStagingStore>>,
    action: impl FnOnce(&mut SqliteStagingStore) -> T,
) -> T {
    let mut binding = store.borrow_mut();
    let staging = binding
        .as_mut()
        .unwrap_or_else(|| panic!("staging database must be initialised"));
    action(staging)
}

#[given("a staging database with named node {named} and unnamed node {unnamed}")]
fn staging_database(store: &RefCell<Option<SqliteStagingStore>>, named: String, unnamed: String) {
    let connection = staging_connection();
    insert_node(&connection, 3, &unnamed, Some(1), "003ref0002A1");
    insert_node(&connection, 8, &named, Some(1), "004name0004Mitte");
    *store.borrow_mut() = Some(SqliteStagingStore::from_connection(connection));
}

#[when("the node table is fetched with the named-only filter")]
fn fetch_named(
    store: &RefCell<Option<SqliteStagingStore>>,
    fetched: &RefCell<Option<Vec<StagingRow>>>,
) {
    let filter = RowFilter {
        named_only: true,
        ..RowFilter::default()
    };
    let rows = with_store(store, |staging| {
        staging
            .fetch_window(EntityKind::Node, &ChunkWindow::new(0, 10), &filter)
            .expect("fetch named rows")
    });
    *fetched.borrow_mut() = Some(rows);
}

#[then("only node {id} is returned")]
fn only_named(fetched: &RefCell<Option<Vec<StagingRow>>>, id: String) {
    let binding = fetched.borrow();
    let rows = binding
        .as_ref()
        .unwrap_or_else(|| panic!("rows must be fetched"));
    let ids: Vec<_> = rows.iter().filter_map(|row| row.osm_id.as_deref()).collect();
    assert_eq!(ids, [id.as_str()]);
}

#[when("node {id} receives object id {object}")]
fn write_object(store: &RefCell<Option<SqliteStagingStore>>, id: String, object: String) {
    let osm_id = OsmId::parse(&id).expect("valid osm id");
    with_store(store, |staging| {
        staging
            .write_back(EntityKind::Node, &osm_id, Some(&object), None)
            .expect("write object id");
    });
}

#[when("node {id} receives geometry id {geometry}")]
fn write_geometry(store: &RefCell<Option<SqliteStagingStore>>, id: String, geometry: String) {
    let osm_id = OsmId::parse(&id).expect("valid osm id");
    with_store(store, |staging| {
        staging
            .write_back(EntityKind::Node, &osm_id, None, Some(&geometry))
            .expect("write geometry id");
    });
}

#[then("node {id} carries object id {object} and geometry id {geometry}")]
fn carries_ids(
    store: &RefCell<Option<SqliteStagingStore>>,
    id: String,
    object: String,
    geometry: String,
) {
    let row = with_store(store, |staging| {
        staging
            .find_by_osm_id(EntityKind::Node, &id)
            .expect("look up node")
    })
    .unwrap_or_else(|| panic!("node {id} must exist"));
    assert_eq!(row.ohdm_object_id.as_deref(), Some(object.as_str()));
    assert_eq!(row.ohdm_geom_id.as_deref(), Some(geometry.as_str()));
}

#[scenario(path = "tests/features/staging_store.feature", index = 0)]
fn named_only_fetch(
    store: RefCell<Option<SqliteStagingStore>>,
    fetched: RefCell<Option<Vec<StagingRow>>>,
) {
    let _ = (store, fetched);
}

#[scenario(path = "tests/features/staging_store.feature", index = 1)]
fn write_back_merges(
    store: RefCell<Option<SqliteStagingStore>>,
    fetched: RefCell<Option<Vec<StagingRow>>>,
) {
    let _ = (store, fetched);
}
