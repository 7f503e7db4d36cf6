//! Typed staging entities.
//!
//! Rows read from the staging tables are assembled into one of three closed
//! variants. Each variant supplies its own structural consistency check, and
//! the shared [`EntityHeader`] carries the attributes every staging table
//! stores.

use std::{fmt, str::FromStr};

use thiserror::Error;

mod id;
mod node;
mod relation;
mod way;

pub use id::{OsmId, OsmIdError};
pub use node::Node;
pub use relation::{Relation, RelationMember};
pub use way::Way;

/// Classification code the staging import assigns to untyped entities.
pub const UNTYPED_CLASS_CODE: &str = "-1";

/// The three staging entity kinds, in migration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntityKind {
    /// Points.
    Node,
    /// Ordered node sequences.
    Way,
    /// Multi-member aggregates.
    Relation,
}

impl EntityKind {
    /// All kinds in the order a full migration processes them.
    pub const ALL: [Self; 3] = [Self::Node, Self::Way, Self::Relation];

    /// Singular lower-case label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }

    /// Plural label matching the staging table naming.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Node => "nodes",
            Self::Way => "ways",
            Self::Relation => "relations",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when an entity kind label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind {0:?} (expected nodes, ways or relations)")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" | "nodes" => Ok(Self::Node),
            "way" | "ways" => Ok(Self::Way),
            "relation" | "relations" => Ok(Self::Relation),
            _ => Err(UnknownEntityKind(s.to_owned())),
        }
    }
}

/// Change-tracking flags recorded by the staging import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    /// Entity appeared for the first time in the latest import.
    pub is_new: bool,
    /// Entity changed since the previous import.
    pub changed: bool,
    /// Entity was deleted upstream.
    pub deleted: bool,
    /// Tag blob carries a name.
    pub has_name: bool,
}

/// Attributes shared by every staging entity.
///
/// The identifier is fixed at construction. Destination identifiers stay
/// `None` until the importer writes them back to the staging row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHeader {
    osm_id: OsmId,
    class_code: String,
    serialized_tags: String,
    ohdm_object_id: Option<String>,
    ohdm_geom_id: Option<String>,
    valid: bool,
    flags: ChangeFlags,
    timestamp: Option<String>,
}

impl EntityHeader {
    /// Create a header with empty tags, no destination ids and cleared flags.
    #[must_use]
    pub fn new(osm_id: OsmId, class_code: impl Into<String>) -> Self {
        Self {
            osm_id,
            class_code: class_code.into(),
            serialized_tags: String::new(),
            ohdm_object_id: None,
            ohdm_geom_id: None,
            valid: false,
            flags: ChangeFlags::default(),
            timestamp: None,
        }
    }

    /// Set the serialized tag blob.
    #[must_use]
    pub fn with_tags(mut self, serialized_tags: impl Into<String>) -> Self {
        self.serialized_tags = serialized_tags.into();
        self
    }

    /// Set the destination identifiers already recorded for this row.
    #[must_use]
    pub fn with_destination_ids(
        mut self,
        object_id: Option<String>,
        geom_id: Option<String>,
    ) -> Self {
        self.ohdm_object_id = object_id;
        self.ohdm_geom_id = geom_id;
        self
    }

    /// Set the validity flag.
    #[must_use]
    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Set the change-tracking flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ChangeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the staging timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Application identifier.
    #[must_use]
    pub const fn osm_id(&self) -> &OsmId {
        &self.osm_id
    }

    /// Classification code.
    #[must_use]
    pub fn class_code(&self) -> &str {
        &self.class_code
    }

    /// Opaque serialized tag blob.
    #[must_use]
    pub fn serialized_tags(&self) -> &str {
        &self.serialized_tags
    }

    /// Destination object identifier, once written back.
    #[must_use]
    pub fn ohdm_object_id(&self) -> Option<&str> {
        self.ohdm_object_id.as_deref()
    }

    /// Destination geometry identifier, once written back.
    #[must_use]
    pub fn ohdm_geom_id(&self) -> Option<&str> {
        self.ohdm_geom_id.as_deref()
    }

    /// Validity flag.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Change-tracking flags.
    #[must_use]
    pub const fn flags(&self) -> ChangeFlags {
        self.flags
    }

    /// Staging timestamp, if recorded.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Whether the classification code marks the entity as untyped.
    #[must_use]
    pub fn is_untyped(&self) -> bool {
        self.class_code.trim() == UNTYPED_CLASS_CODE
    }
}

/// A fully assembled staging entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A point.
    Node(Node),
    /// An ordered node sequence.
    Way(Way),
    /// A multi-member aggregate.
    Relation(Relation),
}

impl Entity {
    /// The variant's kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Way(_) => EntityKind::Way,
            Self::Relation(_) => EntityKind::Relation,
        }
    }

    /// Shared attributes.
    #[must_use]
    pub const fn header(&self) -> &EntityHeader {
        match self {
            Self::Node(node) => node.header(),
            Self::Way(way) => way.header(),
            Self::Relation(relation) => relation.header(),
        }
    }

    /// Application identifier.
    #[must_use]
    pub const fn osm_id(&self) -> &OsmId {
        self.header().osm_id()
    }

    /// Structural consistency check supplied by each variant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self {
            Self::Node(node) => node.is_consistent(),
            Self::Way(way) => way.is_consistent(),
            Self::Relation(relation) => relation.is_consistent(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        write!(
            f,
            "{} {} (classcode {}, tags {:?}",
            self.kind(),
            header.osm_id(),
            header.class_code(),
            header.serialized_tags()
        )?;
        match self {
            Self::Node(node) => write!(
                f,
                ", lon {}, lat {})",
                node.longitude().unwrap_or("?"),
                node.latitude().unwrap_or("?")
            ),
            Self::Way(way) => write!(f, ", {} nodes)", way.nodes().len()),
            Self::Relation(relation) => write!(f, ", {} members)", relation.members().len()),
        }
    }
}

impl From<Node> for Entity {
    fn from(value: Node) -> Self {
        Self::Node(value)
    }
}

impl From<Way> for Entity {
    fn from(value: Way) -> Self {
        Self::Way(value)
    }
}

impl From<Relation> for Entity {
    fn from(value: Relation) -> Self {
        Self::Relation(value)
    }
}
