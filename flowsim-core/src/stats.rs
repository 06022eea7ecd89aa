//! Network statistics and observability types.
//!
//! [`NetworkStats`] provides a point-in-time snapshot of the network state.
//! Obtain one via [`Network::stats`](crate::network::Network::stats).

use crate::{
    link::{ChannelStats, LinkId},
    measure::{Bandwidth, Latency, PacketLoss},
    node::NodeId,
};

/// Snapshot of statistics for a single link.
#[derive(Debug, Clone)]
pub struct LinkStats {
    /// The link identifier (ordered pair of node IDs).
    pub id: LinkId,
    /// Configured latency of this link.
    pub latency: Latency,
    /// Configured bandwidth of this link (applies to both directions independently).
    pub bandwidth: Bandwidth,
    /// Configured packet loss model for this link.
    pub packet_loss: PacketLoss,
    /// Maximum number of packets waiting for the transmitter, per direction.
    pub queue_limit: usize,
    /// Counters of the smaller node to larger node direction.
    pub forward: ChannelStats,
    /// Counters of the larger node to smaller node direction.
    pub reverse: ChannelStats,
}

/// Point-in-time snapshot of the entire network state.
#[derive(Debug, Clone)]
pub struct NetworkStats {
    /// Every node of the network, in ID order.
    pub nodes: Vec<NodeId>,
    /// Per-link statistics, in [`LinkId`] order.
    pub links: Vec<LinkStats>,
}

impl LinkStats {
    /// Packets dropped in either direction, for any reason.
    pub fn dropped(&self) -> u64 {
        [self.forward, self.reverse]
            .iter()
            .map(|c| c.queue_drops + c.loss_drops)
            .sum()
    }
}

impl NetworkStats {
    /// Total number of packets put on any link.
    pub fn tx_packets(&self) -> u64 {
        self.links
            .iter()
            .map(|l| l.forward.tx_packets + l.reverse.tx_packets)
            .sum()
    }

    /// Total number of packets dropped by any link.
    pub fn dropped(&self) -> u64 {
        self.links.iter().map(LinkStats::dropped).sum()
    }
}
