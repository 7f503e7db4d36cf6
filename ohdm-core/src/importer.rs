//! Seam to the destination-store writer.

use crate::{Entity, Node, Relation, Way};

/// Error raised by an importer; the scanner treats it as a row failure.
pub type ImportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Writes assembled entities into the destination store.
///
/// Return values only drive statistics. Implementations borrow the entity for
/// the duration of each call.
pub trait Importer {
    /// Import a node; `Ok(true)` when the destination accepted it.
    ///
    /// # Errors
    /// Returns an error when the destination write fails.
    fn import_node(&mut self, node: &Node, named_only: bool) -> Result<bool, ImportError>;

    /// Import a way and its resolved nodes.
    ///
    /// # Errors
    /// Returns an error when the destination write fails.
    fn import_way(&mut self, way: &Way, named_only: bool) -> Result<bool, ImportError>;

    /// Import a complete relation and its resolved members.
    ///
    /// # Errors
    /// Returns an error when the destination write fails.
    fn import_relation(&mut self, relation: &Relation, named_only: bool)
    -> Result<bool, ImportError>;

    /// Follow-up work after an import; `Ok(true)` when historic information
    /// was found for the entity.
    ///
    /// # Errors
    /// Returns an error when the destination write fails.
    fn import_post_processing(
        &mut self,
        entity: &Entity,
        named_only: bool,
    ) -> Result<bool, ImportError>;
}

impl<I: Importer + ?Sized> Importer for &mut I {
    fn import_node(&mut self, node: &Node, named_only: bool) -> Result<bool, ImportError> {
        (**self).import_node(node, named_only)
    }

    fn import_way(&mut self, way: &Way, named_only: bool) -> Result<bool, ImportError> {
        (**self).import_way(way, named_only)
    }

    fn import_relation(
        &mut self,
        relation: &Relation,
        named_only: bool,
    ) -> Result<bool, ImportError> {
        (**self).import_relation(relation, named_only)
    }

    fn import_post_processing(
        &mut self,
        entity: &Entity,
        named_only: bool,
    ) -> Result<bool, ImportError> {
        (**self).import_post_processing(entity, named_only)
    }
}
