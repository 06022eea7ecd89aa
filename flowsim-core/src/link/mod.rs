mod id;

use crate::{
    defaults::DEFAULT_QUEUE_LIMIT,
    measure::{Bandwidth, Latency, PacketLoss},
    time::SimTime,
};
use rand_core::Rng;
use std::{collections::VecDeque, fmt};

pub use self::id::LinkId;

/// Which direction a packet is travelling across a link.
///
/// [`LinkId`] is symmetric so the direction is tracked separately:
/// `Forward` means `smaller_id → larger_id`, `Reverse` is the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkDirection {
    Forward,
    Reverse,
}

/// Why a packet did not make it to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The transmit queue of the link was full (drop-tail).
    QueueFull,
    /// The packet was corrupted on the link by the [`PacketLoss`] model.
    Lost,
    /// The link has a zero [`Bandwidth`] and cannot transmit anything.
    LinkDown,
    /// No route from the current node to the destination.
    NoRoute,
    /// Nothing is bound to the destination address.
    NoListener,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::QueueFull => "queue full",
            Self::Lost => "lost on link",
            Self::LinkDown => "link down",
            Self::NoRoute => "no route",
            Self::NoListener => "no listener",
        };
        f.write_str(reason)
    }
}

/// Counters of one direction of a [`Link`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub queue_drops: u64,
    pub loss_drops: u64,
}

/// One direction of a point-to-point link: a transmitter that serialises
/// packets one at a time, preceded by a drop-tail queue.
#[derive(Debug, Default)]
struct Channel {
    /// instant at which the transmitter becomes idle
    busy_until: SimTime,
    /// start times of the packets still waiting for the transmitter
    waiting: VecDeque<SimTime>,
    stats: ChannelStats,
}

impl Channel {
    fn queued(&mut self, now: SimTime) -> usize {
        while self.waiting.front().is_some_and(|start| *start <= now) {
            self.waiting.pop_front();
        }
        self.waiting.len()
    }
}

/// A full-duplex point-to-point link between two [`Node`]s.
///
/// Each direction has its own transmitter: a packet entering a direction
/// starts being serialised as soon as the transmitter is idle, occupies it
/// for [`Bandwidth::transmission_time`] and reaches the other end
/// [`Latency`] later. At most `queue_limit` packets wait for the
/// transmitter; any further packet is dropped.
///
/// [`Node`]: crate::node::Node
#[derive(Debug)]
pub struct Link {
    latency: Latency,
    bandwidth: Bandwidth,
    packet_loss: PacketLoss,
    queue_limit: usize,

    forward: Channel,
    reverse: Channel,
}

impl Default for Link {
    fn default() -> Self {
        Self::new(
            Latency::default(),
            Bandwidth::default(),
            PacketLoss::default(),
            DEFAULT_QUEUE_LIMIT,
        )
    }
}

impl Link {
    pub fn new(
        latency: Latency,
        bandwidth: Bandwidth,
        packet_loss: PacketLoss,
        queue_limit: usize,
    ) -> Self {
        Self {
            latency,
            bandwidth,
            packet_loss,
            queue_limit,
            forward: Channel::default(),
            reverse: Channel::default(),
        }
    }

    pub fn latency(&self) -> Latency {
        self.latency
    }

    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    pub fn packet_loss(&self) -> PacketLoss {
        self.packet_loss
    }

    pub fn queue_limit(&self) -> usize {
        self.queue_limit
    }

    pub fn stats(&self, direction: LinkDirection) -> ChannelStats {
        match direction {
            LinkDirection::Forward => self.forward.stats,
            LinkDirection::Reverse => self.reverse.stats,
        }
    }

    fn channel_mut(&mut self, direction: LinkDirection) -> &mut Channel {
        match direction {
            LinkDirection::Forward => &mut self.forward,
            LinkDirection::Reverse => &mut self.reverse,
        }
    }

    /// Hand a packet of `bytes` to the transmitter of `direction` at `now`.
    ///
    /// On success returns the instant the packet reaches the other end of
    /// the link. A packet lost to the [`PacketLoss`] model still occupies
    /// the transmitter before being discarded.
    pub(crate) fn enqueue<R: Rng>(
        &mut self,
        direction: LinkDirection,
        now: SimTime,
        bytes: u64,
        rng: &mut R,
    ) -> Result<SimTime, DropReason> {
        let Some(tx_time) = self.bandwidth.transmission_time(bytes) else {
            return Err(DropReason::LinkDown);
        };
        let latency = self.latency.into_duration();
        let packet_loss = self.packet_loss;
        let queue_limit = self.queue_limit;

        let channel = self.channel_mut(direction);
        if channel.queued(now) >= queue_limit && channel.busy_until > now {
            channel.stats.queue_drops += 1;
            return Err(DropReason::QueueFull);
        }

        let start = channel.busy_until.max(now);
        let finish = start + tx_time;
        channel.busy_until = finish;
        if start > now {
            channel.waiting.push_back(start);
        }

        if packet_loss.should_drop(rng) {
            channel.stats.loss_drops += 1;
            return Err(DropReason::Lost);
        }

        channel.stats.tx_packets += 1;
        channel.stats.tx_bytes += bytes;

        Ok(finish + latency)
    }
}
