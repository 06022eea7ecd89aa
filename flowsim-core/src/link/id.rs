use crate::{link::LinkDirection, node::NodeId};

/// Unique identifier of the link between two nodes
///
/// The link is bidirectional and is unique for two node. I.e.
/// For all nodes `n1` and `n2` the identifier `(n1, n2)` is the
/// same as the identifier `(n2, n1)`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId {
    smaller_id: NodeId,
    larger_id: NodeId,
}

impl LinkId {
    /// create the link identifier from the given node tuple.
    ///
    /// ```
    /// # use flowsim_core::{link::LinkId, node::NodeId};
    /// let n1 = NodeId::new(1);
    /// let n2 = NodeId::new(2);
    /// assert_eq!(LinkId::new((n1, n2)), LinkId::new((n2, n1)));
    /// ```
    pub fn new((a, b): (NodeId, NodeId)) -> Self {
        Self {
            smaller_id: a.min(b),
            larger_id: a.max(b),
        }
    }

    /// get the [`NodeId`]s that compose this link identifier, smaller first
    #[inline]
    pub fn into_nodes(self) -> (NodeId, NodeId) {
        (self.smaller_id, self.larger_id)
    }

    /// The direction of travel for a packet leaving `from` on this link.
    pub fn direction(&self, from: NodeId) -> LinkDirection {
        if from == self.smaller_id {
            LinkDirection::Forward
        } else {
            LinkDirection::Reverse
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_node_order() {
        let n1 = NodeId::new(1);
        let n2 = NodeId::new(2);
        let id = LinkId::new((n2, n1));

        assert_eq!(id.into_nodes(), (n1, n2));
        assert_eq!(id.direction(n1), LinkDirection::Forward);
        assert_eq!(id.direction(n2), LinkDirection::Reverse);
    }
}
