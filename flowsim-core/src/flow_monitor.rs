//! Per-flow statistics collected while the simulation runs.
//!
//! A flow is every packet sharing the same source and destination
//! [`Address`]. The [`FlowMonitor`] is told about every transmission,
//! reception and drop by the [`Simulation`] and keeps the counters needed
//! to compute throughput, delivery ratio, delay and jitter afterwards.
//!
//! [`Simulation`]: crate::sim::Simulation

use crate::{link::DropReason, network::Packet, node::Address, time::SimTime};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    time::Duration,
};
use tracing::trace;

/// Flows are numbered from `1` in the order their first packet was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub source: Address,
    pub destination: Address,
}

/// How delivery and loss percentages are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatioPolicy {
    /// integer percentage, `(x * 100) / sent` rounded down
    #[default]
    Truncated,
    /// floating point percentage
    Exact,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowStats {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    /// packets dropped by a link or at the destination
    pub lost_packets: u64,
    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
    /// sum of the one-way delays of the received packets
    pub delay_sum: Duration,
    /// sum of `|delay(n) - delay(n-1)|` over consecutive received packets
    pub jitter_sum: Duration,
    last_delay: Option<Duration>,
}

/// Aggregate over every flow of a [`FlowMonitor`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowTotals {
    pub flows: usize,
    pub tx_packets: u64,
    pub rx_packets: u64,
    /// packets sent but never received
    pub lost_packets: u64,
    pub delay_sum: Duration,
    pub jitter_sum: Duration,
    /// mean over the flows of their throughput, in bits per second
    pub average_throughput: f64,
}

#[derive(Debug, Default)]
pub struct FlowMonitor {
    ids: HashMap<FlowKey, FlowId>,
    flows: BTreeMap<FlowId, (FlowKey, FlowStats)>,
}

fn percentage(part: u64, whole: u64, policy: RatioPolicy) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some(match policy {
        RatioPolicy::Truncated => ((part * 100) / whole) as f64,
        RatioPolicy::Exact => part as f64 * 100.0 / whole as f64,
    })
}

fn rate(bytes: u64, over: Duration) -> Option<f64> {
    if over.is_zero() {
        return None;
    }
    Some(bytes as f64 * 8.0 / over.as_secs_f64())
}

impl FlowId {
    pub const fn into_u32(self) -> u32 {
        self.0
    }
}

impl FlowStats {
    /// Packets sent but not (yet) received.
    pub fn not_received(&self) -> u64 {
        self.tx_packets.saturating_sub(self.rx_packets)
    }

    /// Received bits per second, averaged over `duration`.
    pub fn throughput_over(&self, duration: Duration) -> Option<f64> {
        rate(self.rx_bytes, duration)
    }

    /// Sent bits per second, averaged over `duration`.
    pub fn offered_load_over(&self, duration: Duration) -> Option<f64> {
        rate(self.tx_bytes, duration)
    }

    /// Received bits per second between the first transmission and the
    /// last reception.
    ///
    /// `None` if nothing was received or if both instants coincide.
    pub fn windowed_throughput(&self) -> Option<f64> {
        let (first_tx, last_rx) = (self.first_tx?, self.last_rx?);
        rate(self.rx_bytes, last_rx.duration_since(first_tx))
    }

    /// Percentage of the sent packets that were received.
    pub fn delivery_ratio(&self, policy: RatioPolicy) -> Option<f64> {
        percentage(self.rx_packets, self.tx_packets, policy)
    }

    /// Percentage of the sent packets that were not received.
    pub fn loss_ratio(&self, policy: RatioPolicy) -> Option<f64> {
        percentage(self.not_received(), self.tx_packets, policy)
    }

    /// Average one-way delay of the received packets.
    pub fn mean_delay(&self) -> Option<Duration> {
        let rx = u32::try_from(self.rx_packets).ok().filter(|rx| *rx > 0)?;
        Some(self.delay_sum / rx)
    }

    /// Average jitter between consecutive received packets.
    pub fn mean_jitter(&self) -> Option<Duration> {
        let pairs = u32::try_from(self.rx_packets.saturating_sub(1))
            .ok()
            .filter(|pairs| *pairs > 0)?;
        Some(self.jitter_sum / pairs)
    }
}

impl FlowTotals {
    pub fn delivery_ratio(&self, policy: RatioPolicy) -> Option<f64> {
        percentage(self.rx_packets, self.tx_packets, policy)
    }

    pub fn loss_ratio(&self, policy: RatioPolicy) -> Option<f64> {
        percentage(self.lost_packets, self.tx_packets, policy)
    }
}

impl FlowMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn classify(&mut self, packet: &Packet) -> &mut FlowStats {
        let key = FlowKey {
            source: packet.source(),
            destination: packet.destination(),
        };
        let next = FlowId(self.ids.len() as u32 + 1);
        let id = *self.ids.entry(key).or_insert(next);

        &mut self.flows.entry(id).or_insert_with(|| (key, FlowStats::default())).1
    }

    pub(crate) fn record_tx(&mut self, packet: &Packet, now: SimTime) {
        let stats = self.classify(packet);
        stats.tx_packets += 1;
        stats.tx_bytes += packet.size();
        stats.first_tx.get_or_insert(now);
        stats.last_tx = Some(now);
    }

    pub(crate) fn record_rx(&mut self, packet: &Packet, now: SimTime) {
        let delay = now.duration_since(packet.sent_at());
        let stats = self.classify(packet);
        stats.rx_packets += 1;
        stats.rx_bytes += packet.size();
        stats.first_rx.get_or_insert(now);
        stats.last_rx = Some(now);

        stats.delay_sum += delay;
        if let Some(previous) = stats.last_delay {
            stats.jitter_sum += delay.abs_diff(previous);
        }
        stats.last_delay = Some(delay);
    }

    pub(crate) fn record_drop(&mut self, packet: &Packet, reason: DropReason) {
        trace!(%packet, %reason, "packet dropped");
        self.classify(packet).lost_packets += 1;
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn flow(&self, id: FlowId) -> Option<(&FlowKey, &FlowStats)> {
        self.flows.get(&id).map(|(key, stats)| (key, stats))
    }

    pub fn find(&self, key: &FlowKey) -> Option<FlowId> {
        self.ids.get(key).copied()
    }

    /// Every flow, in [`FlowId`] order.
    pub fn flows(&self) -> impl Iterator<Item = (FlowId, &FlowKey, &FlowStats)> + '_ {
        self.flows
            .iter()
            .map(|(id, (key, stats))| (*id, key, stats))
    }

    /// Sum every flow; throughputs are averaged over `duration`.
    pub fn totals(&self, duration: Duration) -> FlowTotals {
        let mut totals = FlowTotals::default();
        let mut throughput_sum = 0.0;

        for (_, _, stats) in self.flows() {
            totals.flows += 1;
            totals.tx_packets += stats.tx_packets;
            totals.rx_packets += stats.rx_packets;
            totals.lost_packets += stats.not_received();
            totals.delay_sum += stats.delay_sum;
            totals.jitter_sum += stats.jitter_sum;
            throughput_sum += stats.throughput_over(duration).unwrap_or_default();
        }
        if totals.flows > 0 {
            totals.average_throughput = throughput_sum / totals.flows as f64;
        }

        totals
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}
