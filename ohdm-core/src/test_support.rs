//! In-memory staging store and recording importer for tests.
//!
//! Available to unit tests and, behind the `test-support` feature, to other
//! crates in the workspace.

use std::collections::BTreeMap;

use crate::{
    ChunkWindow, Entity, EntityKind, ImportError, Importer, KeyRange, MembershipRow, Node, OsmId,
    PerKind, Relation, RowFilter, StagingRow, StagingStore, StoreError, UNTYPED_CLASS_CODE, Way,
};

/// A staging row for the node table.
#[must_use]
pub fn node_row(key: i128, osm_id: &str, longitude: &str, latitude: &str) -> StagingRow {
    StagingRow {
        longitude: Some(longitude.to_owned()),
        latitude: Some(latitude.to_owned()),
        ..typed_row(key, osm_id)
    }
}

/// A staging row for the way table.
#[must_use]
pub fn way_row(key: i128, osm_id: &str) -> StagingRow {
    typed_row(key, osm_id)
}

/// A staging row for the relation table.
#[must_use]
pub fn relation_row(key: i128, osm_id: &str) -> StagingRow {
    typed_row(key, osm_id)
}

fn typed_row(key: i128, osm_id: &str) -> StagingRow {
    StagingRow {
        key,
        osm_id: Some(osm_id.to_owned()),
        class_code: Some("1".to_owned()),
        serialized_tags: Some(String::new()),
        valid: Some(true),
        ..StagingRow::default()
    }
}

/// A relation-membership row.
#[must_use]
pub fn membership(
    role: &str,
    node_id: Option<&str>,
    way_id: Option<&str>,
    member_rel_id: Option<&str>,
) -> MembershipRow {
    MembershipRow {
        role: Some(role.to_owned()),
        node_id: node_id.map(str::to_owned),
        way_id: way_id.map(str::to_owned),
        member_rel_id: member_rel_id.map(str::to_owned),
    }
}

#[derive(Debug)]
struct InjectedFailure(&'static str);

impl std::fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "injected {} failure", self.0)
    }
}

impl std::error::Error for InjectedFailure {}

/// [`StagingStore`] backed by ordered maps.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStagingStore {
    tables: PerKind<BTreeMap<i128, StagingRow>>,
    way_nodes: Vec<(String, String)>,
    members: Vec<(String, MembershipRow)>,
    failing_probe: Vec<EntityKind>,
    failing_fetch: Vec<EntityKind>,
}

impl InMemoryStagingStore {
    /// Insert or replace a row keyed by its primary key.
    pub fn insert(&mut self, kind: EntityKind, row: StagingRow) {
        self.tables.get_mut(kind).insert(row.key, row);
    }

    /// Append a way-membership row.
    pub fn add_way_node(&mut self, way_id: &str, node_id: &str) {
        self.way_nodes.push((way_id.to_owned(), node_id.to_owned()));
    }

    /// Append a relation-membership row.
    pub fn add_member(&mut self, relation_id: &str, row: MembershipRow) {
        self.members.push((relation_id.to_owned(), row));
    }

    /// Make probes of `kind` fail.
    pub fn fail_probe(&mut self, kind: EntityKind) {
        self.failing_probe.push(kind);
    }

    /// Make window fetches of `kind` fail.
    pub fn fail_fetch(&mut self, kind: EntityKind) {
        self.failing_fetch.push(kind);
    }

    /// Row of `kind` with the given application identifier.
    #[must_use]
    pub fn row(&self, kind: EntityKind, osm_id: &str) -> Option<&StagingRow> {
        self.tables
            .get(kind)
            .values()
            .find(|row| row.osm_id.as_deref() == Some(osm_id))
    }

    /// Number of rows stored for `kind`.
    #[must_use]
    pub fn len(&self, kind: EntityKind) -> usize {
        self.tables.get(kind).len()
    }

    /// Number of way-membership rows for `way_id`.
    #[must_use]
    pub fn way_node_count(&self, way_id: &str) -> usize {
        self.way_nodes.iter().filter(|(way, _)| way == way_id).count()
    }

    /// Number of relation-membership rows for `relation_id`.
    #[must_use]
    pub fn member_count(&self, relation_id: &str) -> usize {
        self.members
            .iter()
            .filter(|(relation, _)| relation == relation_id)
            .count()
    }

    fn row_mut(&mut self, kind: EntityKind, osm_id: &str) -> Option<&mut StagingRow> {
        self.tables
            .get_mut(kind)
            .values_mut()
            .find(|row| row.osm_id.as_deref() == Some(osm_id))
    }
}

impl StagingStore for InMemoryStagingStore {
    fn probe(&mut self, kind: EntityKind) -> Result<KeyRange, StoreError> {
        if self.failing_probe.contains(&kind) {
            return Err(StoreError::new("probe", InjectedFailure("probe")));
        }
        let table = self.tables.get(kind);
        let (Some(min), Some(max)) = (table.keys().next(), table.keys().next_back()) else {
            return Ok(KeyRange::EMPTY);
        };
        let count = u64::try_from(table.len()).unwrap_or(u64::MAX);
        Ok(KeyRange::new(count, *min, *max))
    }

    fn fetch_window(
        &mut self,
        kind: EntityKind,
        window: &ChunkWindow,
        filter: &RowFilter,
    ) -> Result<Vec<StagingRow>, StoreError> {
        if self.failing_fetch.contains(&kind) {
            return Err(StoreError::new("fetch window", InjectedFailure("fetch")));
        }
        if window.first_key() > window.last_key() {
            return Ok(Vec::new());
        }
        Ok(self
            .tables
            .get(kind)
            .range(window.first_key()..=window.last_key())
            .map(|(_, row)| row)
            .filter(|row| {
                row.class_code.as_deref().map(str::trim) != Some(UNTYPED_CLASS_CODE)
                    && filter.accepts(row.serialized_tags.as_deref())
            })
            .cloned()
            .collect())
    }

    fn way_nodes(&mut self, way_id: &OsmId) -> Result<Vec<StagingRow>, StoreError> {
        Ok(self
            .way_nodes
            .iter()
            .filter(|(way, _)| way == way_id.as_str())
            .filter_map(|(_, node)| self.row(EntityKind::Node, node).cloned())
            .collect())
    }

    fn relation_members(&mut self, relation_id: &OsmId) -> Result<Vec<MembershipRow>, StoreError> {
        Ok(self
            .members
            .iter()
            .filter(|(relation, _)| relation == relation_id.as_str())
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn find_by_osm_id(
        &mut self,
        kind: EntityKind,
        osm_id: &str,
    ) -> Result<Option<StagingRow>, StoreError> {
        Ok(self.row(kind, osm_id).cloned())
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
        if let Some(row) = self.row_mut(kind, osm_id.as_str()) {
            if let Some(id) = object_id {
                row.ohdm_object_id = Some(id.to_owned());
            }
            if let Some(id) = geom_id {
                row.ohdm_geom_id = Some(id.to_owned());
            }
        }
        Ok(())
    }

    fn remove(&mut self, entity: &Entity) -> Result<(), StoreError> {
        let id = entity.osm_id().as_str();
        match entity {
            Entity::Way(_) => self.way_nodes.retain(|(way, _)| way != id),
            Entity::Relation(_) => self.members.retain(|(relation, _)| relation != id),
            Entity::Node(_) => {}
        }
        self.tables
            .get_mut(entity.kind())
            .retain(|_, row| row.osm_id.as_deref() != Some(id));
        Ok(())
    }
}

/// [`Importer`] that records every call.
#[derive(Debug, Clone)]
pub struct RecordingImporter {
    /// Identifiers passed to the import calls, in order.
    pub imported: Vec<(EntityKind, String)>,
    /// Identifiers passed to post-processing, in order.
    pub post_processed: Vec<(EntityKind, String)>,
    /// Value returned by the import calls.
    pub accept: bool,
    /// Value returned by post-processing.
    pub historic: bool,
    /// Identifier whose import fails with an error.
    pub fail_on: Option<String>,
}

impl Default for RecordingImporter {
    fn default() -> Self {
        Self {
            imported: Vec::new(),
            post_processed: Vec::new(),
            accept: true,
            historic: false,
            fail_on: None,
        }
    }
}

impl RecordingImporter {
    /// Identifiers imported for `kind`.
    #[must_use]
    pub fn imported_ids(&self, kind: EntityKind) -> Vec<&str> {
        self.imported
            .iter()
            .filter(|(imported_kind, _)| *imported_kind == kind)
            .map(|(_, id)| id.as_str())
            .collect()
    }

    fn record(&mut self, kind: EntityKind, osm_id: &OsmId) -> Result<bool, ImportError> {
        if self.fail_on.as_deref() == Some(osm_id.as_str()) {
            return Err(format!("destination rejected {kind} {osm_id}").into());
        }
        self.imported.push((kind, osm_id.as_str().to_owned()));
        Ok(self.accept)
    }
}

impl Importer for RecordingImporter {
    fn import_node(&mut self, node: &Node, _named_only: bool) -> Result<bool, ImportError> {
        self.record(EntityKind::Node, node.header().osm_id())
    }

    fn import_way(&mut self, way: &Way, _named_only: bool) -> Result<bool, ImportError> {
        self.record(EntityKind::Way, way.header().osm_id())
    }

    fn import_relation(
        &mut self,
        relation: &Relation,
        _named_only: bool,
    ) -> Result<bool, ImportError> {
        self.record(EntityKind::Relation, relation.header().osm_id())
    }

    fn import_post_processing(
        &mut self,
        entity: &Entity,
        _named_only: bool,
    ) -> Result<bool, ImportError> {
        self.post_processed
            .push((entity.kind(), entity.osm_id().as_str().to_owned()));
        Ok(self.historic)
    }
}
