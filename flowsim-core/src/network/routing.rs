use crate::{link::LinkId, node::NodeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Shortest-path (hop count) next-hop table for every pair of nodes.
///
/// Ties between routes of the same length are broken in favour of the
/// neighbour with the smallest [`NodeId`], so the routes only depend on
/// the topology and not on the order the links were configured in.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    /// `(at, destination) -> next hop`
    next: HashMap<(NodeId, NodeId), NodeId>,
}

impl RoutingTable {
    pub(crate) fn compute<'a, N, L>(nodes: N, links: L) -> Self
    where
        N: IntoIterator<Item = NodeId>,
        L: IntoIterator<Item = &'a LinkId>,
    {
        let mut neighbours: BTreeMap<NodeId, BTreeSet<NodeId>> =
            nodes.into_iter().map(|n| (n, BTreeSet::new())).collect();
        for link in links {
            let (a, b) = link.into_nodes();
            neighbours.entry(a).or_default().insert(b);
            neighbours.entry(b).or_default().insert(a);
        }

        let mut next = HashMap::new();

        // links are symmetric: a breadth first walk from the destination
        // discovers, for every node, the neighbour one hop closer to it.
        for &destination in neighbours.keys() {
            let mut visited = BTreeSet::from([destination]);
            let mut queue = VecDeque::from([destination]);

            while let Some(current) = queue.pop_front() {
                for &neighbour in &neighbours[&current] {
                    if visited.insert(neighbour) {
                        next.insert((neighbour, destination), current);
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        Self { next }
    }

    /// The neighbour to forward to, or `None` if `to` cannot be reached
    /// from `at`. A node is its own next hop.
    pub fn next_hop(&self, at: NodeId, to: NodeId) -> Option<NodeId> {
        if at == to {
            return Some(at);
        }
        self.next.get(&(at, to)).copied()
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}
