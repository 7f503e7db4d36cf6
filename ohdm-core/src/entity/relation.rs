use super::{Entity, EntityHeader};

/// One resolved relation member and its role.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationMember {
    /// Referenced entity, assembled without further resolution.
    pub entity: Entity,
    /// Role string from the membership row (may be empty).
    pub role: String,
}

/// A staging relation and the members resolved from the membership table.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    header: EntityHeader,
    member_ids: Option<String>,
    members: Vec<RelationMember>,
}

impl Relation {
    /// Create a relation with no resolved members.
    ///
    /// `member_ids` is the raw list column and is informational only.
    #[must_use]
    pub const fn new(header: EntityHeader, member_ids: Option<String>) -> Self {
        Self {
            header,
            member_ids,
            members: Vec::new(),
        }
    }

    /// Shared attributes.
    #[must_use]
    pub const fn header(&self) -> &EntityHeader {
        &self.header
    }

    /// Raw member-id list column.
    #[must_use]
    pub fn member_ids(&self) -> Option<&str> {
        self.member_ids.as_deref()
    }

    /// Members in membership-table storage order.
    #[must_use]
    pub fn members(&self) -> &[RelationMember] {
        &self.members
    }

    /// Append a resolved member.
    pub fn push_member(&mut self, entity: Entity, role: impl Into<String>) {
        self.members.push(RelationMember {
            entity,
            role: role.into(),
        });
    }

    /// A relation is consistent when it has at least one member.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.members.is_empty()
    }
}
