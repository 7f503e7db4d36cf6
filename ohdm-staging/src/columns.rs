//! Lenient column decoding for staging rows.
//!
//! Staging databases are produced by external importers, so column storage
//! classes vary: identifiers may be integers or text, flags integers or
//! `t`/`f` strings. Values are normalised to the text and boolean shapes the
//! core expects; a column absent from the result set decodes as `None`.

use ohdm_core::{MembershipRow, StagingRow};
use rusqlite::{
    Row,
    types::{Type, ValueRef},
};

/// Result-set positions of the staging columns.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColumnMap {
    key: Option<usize>,
    osm_id: Option<usize>,
    class_code: Option<usize>,
    serialized_tags: Option<usize>,
    ohdm_object_id: Option<usize>,
    ohdm_geom_id: Option<usize>,
    valid: Option<usize>,
    is_new: Option<usize>,
    changed: Option<usize>,
    deleted: Option<usize>,
    has_name: Option<usize>,
    timestamp: Option<usize>,
    longitude: Option<usize>,
    latitude: Option<usize>,
    node_ids: Option<usize>,
    member_ids: Option<usize>,
}

impl ColumnMap {
    pub(crate) fn new(key_column: &str, names: &[&str]) -> Self {
        let find = |wanted: &str| {
            names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(wanted))
        };
        Self {
            key: find(key_column),
            osm_id: find("osm_id"),
            class_code: find("classcode"),
            serialized_tags: find("serializedtags"),
            ohdm_object_id: find("ohdm_object_id"),
            ohdm_geom_id: find("ohdm_geom_id"),
            valid: find("valid"),
            is_new: find("new"),
            changed: find("changed"),
            deleted: find("deleted"),
            has_name: find("has_name"),
            timestamp: find("tstamp"),
            longitude: find("longitude"),
            latitude: find("latitude"),
            node_ids: find("node_ids"),
            member_ids: find("member_ids"),
        }
    }

    pub(crate) fn read(&self, row: &Row<'_>) -> rusqlite::Result<StagingRow> {
        Ok(StagingRow {
            key: read_key(row, self.key)?,
            osm_id: read_text(row, self.osm_id)?,
            class_code: read_text(row, self.class_code)?,
            serialized_tags: read_text(row, self.serialized_tags)?,
            ohdm_object_id: read_text(row, self.ohdm_object_id)?,
            ohdm_geom_id: read_text(row, self.ohdm_geom_id)?,
            valid: read_flag(row, self.valid)?,
            is_new: read_flag(row, self.is_new)?,
            changed: read_flag(row, self.changed)?,
            deleted: read_flag(row, self.deleted)?,
            has_name: read_flag(row, self.has_name)?,
            timestamp: read_text(row, self.timestamp)?,
            longitude: read_text(row, self.longitude)?,
            latitude: read_text(row, self.latitude)?,
            node_ids: read_text(row, self.node_ids)?,
            member_ids: read_text(row, self.member_ids)?,
        })
    }
}

/// Decode a `relationmember` row selected as `role, node_id, way_id,
/// member_rel_id`.
pub(crate) fn read_membership(row: &Row<'_>) -> rusqlite::Result<MembershipRow> {
    Ok(MembershipRow {
        role: read_text(row, Some(0))?,
        node_id: read_text(row, Some(1))?,
        way_id: read_text(row, Some(2))?,
        member_rel_id: read_text(row, Some(3))?,
    })
}

fn read_key(row: &Row<'_>, index: Option<usize>) -> rusqlite::Result<i128> {
    let Some(index) = index else {
        return Ok(0);
    };
    match row.get_ref(index)? {
        ValueRef::Integer(value) => Ok(i128::from(value)),
        ValueRef::Null => Ok(0),
        other => Err(rusqlite::Error::InvalidColumnType(
            index,
            "id".to_owned(),
            other.data_type(),
        )),
    }
}

fn read_text(row: &Row<'_>, index: Option<usize>) -> rusqlite::Result<Option<String>> {
    let Some(index) = index else {
        return Ok(None);
    };
    Ok(match row.get_ref(index)? {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}

fn read_flag(row: &Row<'_>, index: Option<usize>) -> rusqlite::Result<Option<bool>> {
    let Some(index) = index else {
        return Ok(None);
    };
    let value = row.get_ref(index)?;
    Ok(match value {
        ValueRef::Null => None,
        ValueRef::Integer(flag) => Some(flag != 0),
        ValueRef::Text(bytes) => parse_flag(&String::from_utf8_lossy(bytes)),
        ValueRef::Real(_) | ValueRef::Blob(_) => {
            return Err(rusqlite::Error::InvalidColumnType(
                index,
                "flag".to_owned(),
                if matches!(value, ValueRef::Real(_)) {
                    Type::Real
                } else {
                    Type::Blob
                },
            ));
        }
    })
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" => Some(true),
        "0" | "f" | "false" | "n" | "no" => Some(false),
        _ => None,
    }
}
