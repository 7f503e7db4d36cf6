use super::{EntityHeader, Node};

/// Fewest resolved nodes a way needs to describe a line.
const MIN_WAY_NODES: usize = 2;

/// A staging way and the nodes resolved from the way-membership table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    header: EntityHeader,
    node_ids: Option<String>,
    nodes: Vec<Node>,
}

impl Way {
    /// Create a way with no resolved nodes.
    ///
    /// `node_ids` is the raw list column; it is informational only; nodes are
    /// attached from the membership table with [`Way::push_node`].
    #[must_use]
    pub const fn new(header: EntityHeader, node_ids: Option<String>) -> Self {
        Self {
            header,
            node_ids,
            nodes: Vec::new(),
        }
    }

    /// Shared attributes.
    #[must_use]
    pub const fn header(&self) -> &EntityHeader {
        &self.header
    }

    /// Raw node-id list column.
    #[must_use]
    pub fn node_ids(&self) -> Option<&str> {
        self.node_ids.as_deref()
    }

    /// Nodes in membership-table storage order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Append a resolved node.
    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// A way is consistent when at least two of its nodes were resolved and
    /// every resolved node is itself consistent.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.nodes.len() >= MIN_WAY_NODES && self.nodes.iter().all(Node::is_consistent)
    }
}
