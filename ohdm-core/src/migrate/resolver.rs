//! Relation membership resolution.

use crate::{Entity, Relation, StagingStore};

use super::{RowError, assemble};

/// How many membership levels are resolved below a scanned relation.
///
/// Members are assembled as plain entities: member ways carry no nodes and
/// member relations carry no members of their own.
pub const RELATION_RESOLUTION_DEPTH: usize = 1;

/// A relation with its members attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The relation, members in membership-table order.
    pub relation: Relation,
    /// `false` when a member target was missing; resolution stopped there.
    pub complete: bool,
}

/// Attach members to `relation` from the relation-membership table.
///
/// A missing target is not an error: the resolution is marked incomplete and
/// the remaining membership rows are skipped.
///
/// # Errors
/// Returns [`RowError`] when the store fails, a member row cannot be
/// assembled, or a membership row names no target.
pub fn resolve<S>(store: &mut S, relation: Relation) -> Result<Resolution, RowError>
where
    S: StagingStore + ?Sized,
{
    resolve_to_depth(store, relation, RELATION_RESOLUTION_DEPTH)
}

pub(crate) fn resolve_to_depth<S>(
    store: &mut S,
    mut relation: Relation,
    depth: usize,
) -> Result<Resolution, RowError>
where
    S: StagingStore + ?Sized,
{
    let mut complete = true;
    if depth == 0 {
        return Ok(Resolution { relation, complete });
    }
    let memberships = store.relation_members(relation.header().osm_id())?;
    for membership in memberships {
        let Some((kind, target_id)) = membership.target() else {
            return Err(RowError::MembershipWithoutTarget {
                relation: relation.header().osm_id().clone(),
            });
        };
        let Some(row) = store.find_by_osm_id(kind, target_id)? else {
            log::debug!(
                "relation {} references missing {kind} {target_id}",
                relation.header().osm_id()
            );
            complete = false;
            break;
        };
        let member = match assemble(&row, kind)? {
            Entity::Relation(nested) => {
                let resolved = resolve_to_depth(store, nested, depth.saturating_sub(1))?;
                complete = resolved.complete;
                Entity::Relation(resolved.relation)
            }
            plain => plain,
        };
        relation.push_member(member, membership.role.unwrap_or_default());
        if !complete {
            break;
        }
    }
    Ok(Resolution { relation, complete })
}
