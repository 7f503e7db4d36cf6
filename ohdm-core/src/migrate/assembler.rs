//! Staging row to entity mapping.

use thiserror::Error;

use crate::{
    ChangeFlags, Entity, EntityHeader, EntityKind, Node, OsmId, OsmIdError, Relation, StagingRow,
    Way,
};

/// Row-level failure while assembling an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// A required column was null or absent.
    #[error("required column `{column}` is missing")]
    MissingColumn {
        /// Name of the staging column.
        column: &'static str,
    },
    /// The identifier column does not hold an integer.
    #[error("invalid osm_id: {source}")]
    InvalidIdentifier {
        /// Parse failure.
        #[source]
        source: OsmIdError,
    },
}

/// Build a plain entity of `kind` from a staging row.
///
/// Ways come back without nodes and relations without members; optional flags
/// default to `false` and a missing tag blob to the empty string.
///
/// # Errors
/// Returns [`AssembleError`] when `osm_id` or `classcode` is absent, or when
/// the identifier is not an integer.
pub fn assemble(row: &StagingRow, kind: EntityKind) -> Result<Entity, AssembleError> {
    let header = header(row)?;
    Ok(match kind {
        EntityKind::Node => node_from(header, row).into(),
        EntityKind::Way => Way::new(header, row.node_ids.clone()).into(),
        EntityKind::Relation => Relation::new(header, row.member_ids.clone()).into(),
    })
}

/// Build a node from a row of the node table or the way-node join.
///
/// # Errors
/// Fails under the same conditions as [`assemble`].
pub fn assemble_node(row: &StagingRow) -> Result<Node, AssembleError> {
    Ok(node_from(header(row)?, row))
}

fn node_from(header: EntityHeader, row: &StagingRow) -> Node {
    Node::new(header, row.longitude.clone(), row.latitude.clone())
}

fn header(row: &StagingRow) -> Result<EntityHeader, AssembleError> {
    let raw_id = row
        .osm_id
        .as_deref()
        .ok_or(AssembleError::MissingColumn { column: "osm_id" })?;
    let osm_id =
        OsmId::parse(raw_id).map_err(|source| AssembleError::InvalidIdentifier { source })?;
    let class_code = row
        .class_code
        .clone()
        .ok_or(AssembleError::MissingColumn { column: "classcode" })?;

    Ok(EntityHeader::new(osm_id, class_code)
        .with_tags(row.serialized_tags.clone().unwrap_or_default())
        .with_destination_ids(row.ohdm_object_id.clone(), row.ohdm_geom_id.clone())
        .with_valid(row.valid.unwrap_or(false))
        .with_flags(ChangeFlags {
            is_new: row.is_new.unwrap_or(false),
            changed: row.changed.unwrap_or(false),
            deleted: row.deleted.unwrap_or(false),
            has_name: row.has_name.unwrap_or(false),
        })
        .with_timestamp(row.timestamp.clone()))
}
