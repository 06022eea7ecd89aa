mod packet;
mod routing;

use crate::{
    defaults::DEFAULT_QUEUE_LIMIT,
    link::{DropReason, Link, LinkId},
    measure::{Bandwidth, Latency, PacketLoss},
    node::{Node, NodeId},
    time::SimTime,
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub use self::{
    packet::{Packet, PacketBuilder, PacketId, PacketIdGenerator},
    routing::RoutingTable,
};

/// The topology of the simulation: nodes, the point-to-point links
/// between them and the routes computed over those links.
///
/// The [`Network`] does not keep track of time by itself. It is handed the
/// current simulated time by the [`Simulation`] whenever a packet enters a
/// link and answers with the instant the packet reaches the next node.
///
/// # Example
///
/// ```
/// use flowsim_core::{network::Network, measure::Latency};
///
/// let mut network = Network::new();
/// let n0 = network.add_node();
/// let n1 = network.add_node();
/// let n2 = network.add_node();
///
/// network
///     .configure_link(n0, n1)
///     .set_bandwidth("5Mbps".parse().unwrap())
///     .set_latency(Latency::from_millis(30))
///     .apply()
///     .unwrap();
/// network.configure_link(n1, n2).apply().unwrap();
///
/// network.populate_routing_tables();
/// assert_eq!(network.next_hop(n0, n2).unwrap(), n1);
/// assert_eq!(network.path(n0, n2).unwrap(), vec![n0, n1, n2]);
/// ```
///
/// [`Simulation`]: crate::sim::Simulation
pub struct Network {
    packet_id_generator: PacketIdGenerator,

    nodes: BTreeMap<NodeId, Node>,

    links: BTreeMap<LinkId, Link>,

    routes: RoutingTable,
    routes_stale: bool,

    /// the last assigned ID
    ///
    /// ID 0 is an error and shouldn't be given
    id: NodeId,

    /// Centralised RNG for all packet-loss decisions on every link.
    rng: ChaChaRng,
}

/// Builder for configuring a link between two nodes.
///
/// Obtained via [`Network::configure_link`]. Call [`LinkBuilder::apply`] to
/// commit the configuration.
pub struct LinkBuilder<'a> {
    a: NodeId,
    b: NodeId,
    latency: Latency,
    bandwidth: Bandwidth,
    packet_loss: PacketLoss,
    queue_limit: usize,
    network: &'a mut Network,
}

/// Error returned when a route between two nodes cannot be established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Node ({node}) Not Found")]
    NodeNotFound { node: NodeId },
    #[error("Cannot link node ({node}) to itself")]
    SelfLink { node: NodeId },
    #[error("No route from {from} to {to}")]
    Unreachable { from: NodeId, to: NodeId },
}

/// The outcome of handing a packet to the link towards its next hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// The packet will reach `node` at `at`.
    Arrive { node: NodeId, at: SimTime },
    /// The packet was dropped.
    Dropped(DropReason),
}

impl<'a> LinkBuilder<'a> {
    /// Set the one-way latency of this link.
    pub fn set_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Set the data rate of this link. Both directions get the same rate,
    /// each with its own transmitter.
    pub fn set_bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Set the probabilistic packet loss rate for this link.
    pub fn set_packet_loss(mut self, packet_loss: PacketLoss) -> Self {
        self.packet_loss = packet_loss;
        self
    }

    /// Set how many packets may wait for the transmitter, per direction.
    pub fn set_queue_limit(mut self, queue_limit: usize) -> Self {
        self.queue_limit = queue_limit;
        self
    }

    /// Commit the link configuration to the network.
    ///
    /// An existing link between the same nodes is replaced.
    pub fn apply(self) -> Result<LinkId, RouteError> {
        let Self {
            a,
            b,
            latency,
            bandwidth,
            packet_loss,
            queue_limit,
            network,
        } = self;

        for node in [a, b] {
            if !network.nodes.contains_key(&node) {
                return Err(RouteError::NodeNotFound { node });
            }
        }
        if a == b {
            return Err(RouteError::SelfLink { node: a });
        }

        let id = LinkId::new((a, b));
        debug!(%a, %b, %latency, %bandwidth, "configure link");
        network
            .links
            .insert(id, Link::new(latency, bandwidth, packet_loss, queue_limit));
        network.routes_stale = true;

        Ok(id)
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create a new, empty simulated network.
    pub fn new() -> Self {
        Self {
            packet_id_generator: PacketIdGenerator::new(),
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            routes: RoutingTable::default(),
            routes_stale: false,
            id: NodeId::ZERO,
            rng: ChaChaRng::seed_from_u64(0),
        }
    }

    /// Re-seed the random-number generator used by every link's
    /// [`PacketLoss`] model. The default seed is `0`.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaChaRng::seed_from_u64(seed);
    }

    pub fn packet_id_generator(&mut self) -> &mut PacketIdGenerator {
        &mut self.packet_id_generator
    }

    /// Add a node to the network.
    ///
    /// Node IDs are assigned sequentially starting at `1`.
    pub fn add_node(&mut self) -> NodeId {
        self.id = self.id.next();
        self.nodes.insert(self.id, Node::new(self.id));
        self.id
    }

    /// Add `count` nodes to the network.
    pub fn add_nodes(&mut self, count: usize) -> Vec<NodeId> {
        (0..count).map(|_| self.add_node()).collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, RouteError> {
        self.nodes
            .get_mut(&id)
            .ok_or(RouteError::NodeNotFound { node: id })
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn link(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.links.get(&LinkId::new((a, b)))
    }

    /// Configure the link between two nodes.
    pub fn configure_link(&mut self, a: NodeId, b: NodeId) -> LinkBuilder<'_> {
        LinkBuilder {
            a,
            b,
            latency: Latency::default(),
            bandwidth: Bandwidth::default(),
            packet_loss: PacketLoss::default(),
            queue_limit: DEFAULT_QUEUE_LIMIT,
            network: self,
        }
    }

    /// Compute shortest-path (hop count) routes between every pair of
    /// nodes over the links configured so far.
    ///
    /// Routes are recomputed automatically before the next transmission if
    /// links changed since the last call.
    pub fn populate_routing_tables(&mut self) {
        self.routes = RoutingTable::compute(self.nodes.keys().copied(), self.links.keys());
        self.routes_stale = false;
        debug!(nodes = self.nodes.len(), links = self.links.len(), "routing tables populated");
    }

    fn refresh_routes(&mut self) {
        if self.routes_stale {
            self.populate_routing_tables();
        }
    }

    /// The neighbour of `at` a packet for `to` must be forwarded to.
    pub fn next_hop(&self, at: NodeId, to: NodeId) -> Result<NodeId, RouteError> {
        for node in [at, to] {
            if !self.nodes.contains_key(&node) {
                return Err(RouteError::NodeNotFound { node });
            }
        }
        self.routes
            .next_hop(at, to)
            .ok_or(RouteError::Unreachable { from: at, to })
    }

    /// Every node on the route from `from` to `to`, both included.
    pub fn path(&self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>, RouteError> {
        let mut path = vec![from];
        let mut at = from;
        while at != to {
            at = self.next_hop(at, to)?;
            path.push(at);
        }
        Ok(path)
    }

    /// Hand `packet`, currently at node `at`, to the link towards its next
    /// hop at time `now`.
    pub fn transmit(&mut self, packet: &Packet, at: NodeId, now: SimTime) -> Hop {
        self.refresh_routes();

        let destination = packet.destination().node;
        let Ok(next) = self.next_hop(at, destination) else {
            return Hop::Dropped(DropReason::NoRoute);
        };
        let id = LinkId::new((at, next));
        let Some(link) = self.links.get_mut(&id) else {
            return Hop::Dropped(DropReason::NoRoute);
        };

        match link.enqueue(id.direction(at), now, packet.size(), &mut self.rng) {
            Ok(arrival) => Hop::Arrive {
                node: next,
                at: arrival,
            },
            Err(reason) => Hop::Dropped(reason),
        }
    }

    /// Returns a point-in-time snapshot of every link's configuration and
    /// counters.
    pub fn stats(&self) -> crate::stats::NetworkStats {
        use crate::{
            link::LinkDirection,
            stats::{LinkStats, NetworkStats},
        };

        let links = self
            .links
            .iter()
            .map(|(id, link)| LinkStats {
                id: *id,
                latency: link.latency(),
                bandwidth: link.bandwidth(),
                packet_loss: link.packet_loss(),
                queue_limit: link.queue_limit(),
                forward: link.stats(LinkDirection::Forward),
                reverse: link.stats(LinkDirection::Reverse),
            })
            .collect();

        NetworkStats {
            nodes: self.nodes.keys().copied().collect(),
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Address;
    use std::time::Duration;

    /// n1 -- n2 -- n3, 1Mbps, zero latency
    fn chain() -> (Network, [NodeId; 3]) {
        let mut net = Network::new();
        let n = [net.add_node(), net.add_node(), net.add_node()];
        for pair in n.windows(2) {
            net.configure_link(pair[0], pair[1])
                .set_latency(Latency::ZERO)
                .set_bandwidth(Bandwidth::new(1_000_000))
                .apply()
                .unwrap();
        }
        net.populate_routing_tables();
        (net, n)
    }

    fn packet(net: &mut Network, from: NodeId, to: NodeId, size: u64) -> Packet {
        Packet::builder(net.packet_id_generator())
            .from(Address::new(from, 1))
            .to(Address::new(to, 2))
            .size(size)
            .build()
            .unwrap()
    }

    #[test]
    fn node_ids_start_at_one() {
        let mut net = Network::new();
        assert_eq!(net.add_node(), NodeId::ONE);
        assert_eq!(net.add_nodes(2), vec![NodeId::new(2), NodeId::new(3)]);
    }

    #[test]
    fn link_to_unknown_node() {
        let mut net = Network::new();
        let n1 = net.add_node();
        let err = net.configure_link(n1, NodeId::new(99)).apply().unwrap_err();
        assert_eq!(
            err,
            RouteError::NodeNotFound {
                node: NodeId::new(99)
            }
        );
        assert_eq!(
            net.configure_link(n1, n1).apply().unwrap_err(),
            RouteError::SelfLink { node: n1 }
        );
    }

    #[test]
    fn transmit_hop_by_hop() {
        let (mut net, [n1, n2, n3]) = chain();
        let pkt = packet(&mut net, n1, n3, 125);

        // 1_000 bits at 1Mbps = 1ms per hop
        let Hop::Arrive { node, at } = net.transmit(&pkt, n1, SimTime::ZERO) else {
            panic!("expected the packet to be forwarded");
        };
        assert_eq!(node, n2);
        assert_eq!(at, SimTime::from_millis(1));

        let hop = net.transmit(&pkt, n2, at);
        assert_eq!(
            hop,
            Hop::Arrive {
                node: n3,
                at: SimTime::from_millis(2)
            }
        );
    }

    #[test]
    fn unreachable_is_dropped() {
        let mut net = Network::new();
        let n1 = net.add_node();
        let n2 = net.add_node();
        let pkt = packet(&mut net, n1, n2, 10);

        assert_eq!(
            net.transmit(&pkt, n1, SimTime::ZERO),
            Hop::Dropped(DropReason::NoRoute)
        );
        assert_eq!(
            net.next_hop(n1, n2),
            Err(RouteError::Unreachable { from: n1, to: n2 })
        );
    }

    #[test]
    fn routes_refresh_after_new_link() {
        let mut net = Network::new();
        let n1 = net.add_node();
        let n2 = net.add_node();
        net.populate_routing_tables();

        net.configure_link(n1, n2).apply().unwrap();
        let pkt = packet(&mut net, n1, n2, 10);
        assert!(matches!(
            net.transmit(&pkt, n1, SimTime::ZERO),
            Hop::Arrive { node, .. } if node == n2
        ));
    }

    #[test]
    fn full_packet_loss_drops() {
        let mut net = Network::new();
        let n1 = net.add_node();
        let n2 = net.add_node();
        net.configure_link(n1, n2)
            .set_packet_loss(PacketLoss::new(1.0).unwrap())
            .apply()
            .unwrap();
        let pkt = packet(&mut net, n1, n2, 10);

        assert_eq!(
            net.transmit(&pkt, n1, SimTime::ZERO),
            Hop::Dropped(DropReason::Lost)
        );
    }

    #[test]
    fn stats_snapshot() {
        let (mut net, [n1, _, n3]) = chain();
        let pkt = packet(&mut net, n1, n3, 125);
        net.transmit(&pkt, n1, SimTime::ZERO + Duration::from_millis(1));

        let stats = net.stats();
        assert_eq!(stats.nodes.len(), 3);
        assert_eq!(stats.links.len(), 2);
        assert_eq!(stats.links[0].forward.tx_packets, 1);
        assert_eq!(stats.links[0].forward.tx_bytes, 125);
        assert_eq!(stats.links[0].reverse.tx_packets, 0);
    }
}
