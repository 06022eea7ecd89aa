use crate::{network::Packet, node::Address, time::SimTime};

/// Read access to a cumulative received-bytes counter.
///
/// The counter never decreases during a simulation.
pub trait RxCounter {
    fn total_received_bytes(&self) -> u64;
}

/// Receiving endpoint bound to an [`Address`]: accepts every datagram sent
/// to it and counts what it received.
#[derive(Debug, Clone)]
pub struct PacketSink {
    address: Address,
    total_received_bytes: u64,
    received_packets: u64,
    first_rx: Option<SimTime>,
    last_rx: Option<SimTime>,
}

impl PacketSink {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            total_received_bytes: 0,
            received_packets: 0,
            first_rx: None,
            last_rx: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn received_packets(&self) -> u64 {
        self.received_packets
    }

    pub fn first_rx(&self) -> Option<SimTime> {
        self.first_rx
    }

    pub fn last_rx(&self) -> Option<SimTime> {
        self.last_rx
    }

    pub(crate) fn receive(&mut self, packet: &Packet, now: SimTime) {
        self.total_received_bytes += packet.size();
        self.received_packets += 1;
        self.first_rx.get_or_insert(now);
        self.last_rx = Some(now);
    }
}

impl RxCounter for PacketSink {
    fn total_received_bytes(&self) -> u64 {
        self.total_received_bytes
    }
}
