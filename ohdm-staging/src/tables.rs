//! Static table descriptors and schema qualification.

use ohdm_core::EntityKind;

use crate::StagingOpenError;

/// Columns every entity table carries, after the primary key.
pub const COMMON_COLUMNS: [&str; 11] = [
    "osm_id",
    "classcode",
    "serializedtags",
    "ohdm_object_id",
    "ohdm_geom_id",
    "valid",
    "new",
    "changed",
    "deleted",
    "has_name",
    "tstamp",
];

/// Way-membership table.
pub const WAY_NODES_TABLE: &str = "waynodes";

/// Relation-membership table.
pub const RELATION_MEMBER_TABLE: &str = "relationmember";

/// Per-kind description of a staging entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindTable {
    /// Kind stored in the table.
    pub kind: EntityKind,
    /// Unqualified table name.
    pub table: &'static str,
    /// Integer primary key used for windowing.
    pub key_column: &'static str,
    /// Columns specific to the kind.
    pub kind_columns: &'static [&'static str],
}

const NODES: KindTable = KindTable {
    kind: EntityKind::Node,
    table: "nodes",
    key_column: "id",
    kind_columns: &["longitude", "latitude"],
};

const WAYS: KindTable = KindTable {
    kind: EntityKind::Way,
    table: "ways",
    key_column: "id",
    kind_columns: &["node_ids"],
};

const RELATIONS: KindTable = KindTable {
    kind: EntityKind::Relation,
    table: "relations",
    key_column: "id",
    kind_columns: &["member_ids"],
};

impl KindTable {
    /// Descriptor for `kind`.
    #[must_use]
    pub const fn for_kind(kind: EntityKind) -> &'static Self {
        match kind {
            EntityKind::Node => &NODES,
            EntityKind::Way => &WAYS,
            EntityKind::Relation => &RELATIONS,
        }
    }

    /// Quoted select list: key, common columns, kind columns.
    ///
    /// `alias` prefixes every column when the table is joined.
    #[must_use]
    pub fn select_list(&self, alias: Option<&str>) -> String {
        let prefix = alias.map(|name| format!("{name}.")).unwrap_or_default();
        std::iter::once(self.key_column)
            .chain(COMMON_COLUMNS)
            .chain(self.kind_columns.iter().copied())
            .map(|column| format!("{prefix}\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Resolves table names, optionally inside an attached schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNames {
    schema: Option<String>,
}

impl TableNames {
    /// Tables in the main database.
    #[must_use]
    pub const fn main() -> Self {
        Self { schema: None }
    }

    /// Tables inside the attached schema `name`.
    ///
    /// # Errors
    /// Returns [`StagingOpenError::InvalidSchema`] unless `name` is a plain
    /// identifier of ASCII letters, digits and underscores.
    pub fn in_schema(name: &str) -> Result<Self, StagingOpenError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit());
        if !valid {
            return Err(StagingOpenError::InvalidSchema {
                name: name.to_owned(),
            });
        }
        Ok(Self {
            schema: Some(name.to_owned()),
        })
    }

    /// Schema qualifier, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Qualified name for `table` (or an index) in statements.
    #[must_use]
    pub fn qualify(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) => format!("\"{schema}\".\"{table}\""),
            None => format!("\"{table}\""),
        }
    }

    /// Qualified name of the table holding `kind`.
    #[must_use]
    pub fn entity_table(&self, kind: EntityKind) -> String {
        self.qualify(KindTable::for_kind(kind).table)
    }
}
