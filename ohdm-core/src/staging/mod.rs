//! Access to the intermediate staging store.
//!
//! The [`StagingStore`] trait is the only way the migration pipeline reads or
//! updates staging data. Rows cross the seam as loosely typed
//! [`StagingRow`]s; turning them into entities is the assembler's job, so an
//! adapter never has to know which columns are mandatory.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{ChunkWindow, Entity, EntityKind, KeyRange, OsmId};

/// Substring of the serialized tag blob that marks a named entity.
pub const NAME_MARKER: &str = "004name";

/// One staging table row with every column optional.
///
/// Identifiers and coordinates are carried as text so values wider than 64
/// bits and decimal precision survive unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingRow {
    /// Primary key used for windowing.
    pub key: i128,
    /// Application identifier.
    pub osm_id: Option<String>,
    /// Classification code.
    pub class_code: Option<String>,
    /// Serialized tag blob.
    pub serialized_tags: Option<String>,
    /// Destination object identifier.
    pub ohdm_object_id: Option<String>,
    /// Destination geometry identifier.
    pub ohdm_geom_id: Option<String>,
    /// Validity flag.
    pub valid: Option<bool>,
    /// New-entity flag.
    pub is_new: Option<bool>,
    /// Changed flag.
    pub changed: Option<bool>,
    /// Deleted flag.
    pub deleted: Option<bool>,
    /// Has-name flag.
    pub has_name: Option<bool>,
    /// Staging timestamp.
    pub timestamp: Option<String>,
    /// Node longitude.
    pub longitude: Option<String>,
    /// Node latitude.
    pub latitude: Option<String>,
    /// Way node-id list column.
    pub node_ids: Option<String>,
    /// Relation member-id list column.
    pub member_ids: Option<String>,
}

/// One row of the relation-membership table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipRow {
    /// Member role; may be empty or absent.
    pub role: Option<String>,
    /// Referenced node identifier.
    pub node_id: Option<String>,
    /// Referenced way identifier.
    pub way_id: Option<String>,
    /// Referenced relation identifier.
    pub member_rel_id: Option<String>,
}

impl MembershipRow {
    /// The referenced kind and identifier: the first non-null of node, way
    /// and member relation.
    #[must_use]
    pub fn target(&self) -> Option<(EntityKind, &str)> {
        [
            (EntityKind::Node, self.node_id.as_deref()),
            (EntityKind::Way, self.way_id.as_deref()),
            (EntityKind::Relation, self.member_rel_id.as_deref()),
        ]
        .into_iter()
        .find_map(|(kind, id)| id.map(|value| (kind, value)))
    }
}

/// Row filter applied while fetching a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    /// Keep only rows whose tag blob contains `name_marker`.
    pub named_only: bool,
    /// Marker substring identifying named rows.
    pub name_marker: String,
}

impl Default for RowFilter {
    fn default() -> Self {
        Self {
            named_only: false,
            name_marker: NAME_MARKER.to_owned(),
        }
    }
}

impl RowFilter {
    /// Whether a row with the given tag blob passes the filter.
    #[must_use]
    pub fn accepts(&self, serialized_tags: Option<&str>) -> bool {
        !self.named_only || serialized_tags.is_some_and(|tags| tags.contains(&self.name_marker))
    }
}

/// Failure reported by a staging store adapter.
#[derive(Debug, Error)]
#[error("staging store failed to {operation}: {source}")]
pub struct StoreError {
    /// What the store was doing.
    pub operation: String,
    /// Underlying adapter error.
    #[source]
    pub source: Box<dyn StdError + Send + Sync + 'static>,
}

impl StoreError {
    /// Wrap an adapter error with the operation it interrupted.
    pub fn new(
        operation: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Read and update access to the staging tables.
///
/// Every call is a synchronous blocking query. A store instance is owned by
/// exactly one scanner.
pub trait StagingStore {
    /// Count, smallest and largest primary key of the kind's table.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the table cannot be queried.
    fn probe(&mut self, kind: EntityKind) -> Result<KeyRange, StoreError>;

    /// Typed rows with key inside `window`, ascending by key.
    ///
    /// Untyped rows are excluded and `filter` is applied.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the window cannot be read.
    fn fetch_window(
        &mut self,
        kind: EntityKind,
        window: &ChunkWindow,
        filter: &RowFilter,
    ) -> Result<Vec<StagingRow>, StoreError>;

    /// Node rows joined through the way-membership table, in storage order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the join fails.
    fn way_nodes(&mut self, way_id: &OsmId) -> Result<Vec<StagingRow>, StoreError>;

    /// Membership rows of a relation, in storage order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the membership table cannot be read.
    fn relation_members(&mut self, relation_id: &OsmId) -> Result<Vec<MembershipRow>, StoreError>;

    /// Look a row up by application identifier.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the lookup fails.
    fn find_by_osm_id(
        &mut self,
        kind: EntityKind,
        osm_id: &str,
    ) -> Result<Option<StagingRow>, StoreError>;

    /// Record destination identifiers on the staging row. A no-op when both
    /// are `None`; an absent id leaves the stored value untouched.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the update fails.
    fn write_back(
        &mut self,
        kind: EntityKind,
        osm_id: &OsmId,
        object_id: Option<&str>,
        geom_id: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Delete an entity's membership rows, then its staging row.
    ///
    /// # Errors
    /// Returns [`StoreError`] when either delete fails.
    fn remove(&mut self, entity: &Entity) -> Result<(), StoreError>;
}
