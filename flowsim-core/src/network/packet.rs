use crate::{node::Address, time::SimTime};
use anyhow::{Result, bail};
use std::fmt;

/// a generator for monotonically increasing **unique** [`PacketId`]
#[derive(Debug, Clone)]
pub struct PacketIdGenerator(u64);

/// # [`Packet`] Identifier
///
/// During the lifetime of the simulation, this identifier uniquely
/// identifies the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(u64);

/// A datagram travelling through the [`Network`].
///
/// Packets carry no payload: only their size matters to the links they
/// cross. The sending time is stamped by the sender so that the receiver
/// side can measure the one-way delay.
///
/// [`Network`]: crate::network::Network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: PacketId,
    source: Address,
    destination: Address,
    size: u64,
    sent_at: SimTime,
}

pub struct PacketBuilder<'a> {
    generator: &'a mut PacketIdGenerator,
    source: Option<Address>,
    destination: Option<Address>,
    size: Option<u64>,
    sent_at: SimTime,
}

impl PacketIdGenerator {
    pub fn new() -> Self {
        Self(1)
    }

    /// generate a new unique identifier
    pub fn generate(&mut self) -> PacketId {
        let id = self.0;
        self.0 = self.0.wrapping_add(1);

        debug_assert!(
            id != 0,
            "the generator wrapped around after `u64::MAX` packets"
        );

        PacketId(id)
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PacketBuilder<'a> {
    pub fn new(generator: &'a mut PacketIdGenerator) -> Self {
        Self {
            generator,
            source: None,
            destination: None,
            size: None,
            sent_at: SimTime::ZERO,
        }
    }

    pub fn from(mut self, source: Address) -> Self {
        self.source = Some(source);
        self
    }

    pub fn to(mut self, destination: Address) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn sent_at(mut self, time: SimTime) -> Self {
        self.sent_at = time;
        self
    }

    pub fn build(self) -> Result<Packet> {
        let Some(source) = self.source else {
            bail!("Missing sender information (`from')")
        };
        let Some(destination) = self.destination else {
            bail!("Missing recipient information (`to')")
        };
        let Some(size) = self.size else {
            bail!("Missing packet size (`size')")
        };

        Ok(Packet {
            id: self.generator.generate(),
            source,
            destination,
            size,
            sent_at: self.sent_at,
        })
    }
}

impl Packet {
    pub fn builder(generator: &mut PacketIdGenerator) -> PacketBuilder<'_> {
        PacketBuilder::new(generator)
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn source(&self) -> Address {
        self.source
    }

    pub fn destination(&self) -> Address {
        self.destination
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sent_at(&self) -> SimTime {
        self.sent_at
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{id}] {from} -> {to} ({size} bytes)",
            id = self.id,
            from = self.source,
            to = self.destination,
            size = self.size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn address(node: u64) -> Address {
        Address::new(NodeId::new(node), 9)
    }

    #[test]
    fn ids_are_unique() {
        let mut generator = PacketIdGenerator::new();
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a.to_string(), "0x0000000000000001");
    }

    #[test]
    fn builder_missing_from() {
        let Err(error) = Packet::builder(&mut PacketIdGenerator::new()).build() else {
            panic!("Expecting an error because missing the `from'")
        };

        assert_eq!(error.to_string(), "Missing sender information (`from')");
    }

    #[test]
    fn builder_missing_to() {
        let Err(error) = Packet::builder(&mut PacketIdGenerator::new())
            .from(address(1))
            .build()
        else {
            panic!("Expecting an error because missing the `to'")
        };

        assert_eq!(error.to_string(), "Missing recipient information (`to')");
    }

    #[test]
    fn builder_missing_size() {
        let Err(error) = Packet::builder(&mut PacketIdGenerator::new())
            .from(address(1))
            .to(address(2))
            .build()
        else {
            panic!("Expecting an error because missing the `size'")
        };

        assert_eq!(error.to_string(), "Missing packet size (`size')");
    }

    #[test]
    fn builder() {
        let packet = Packet::builder(&mut PacketIdGenerator::new())
            .from(address(1))
            .to(address(2))
            .size(1_040)
            .sent_at(SimTime::from_secs(1))
            .build()
            .unwrap();

        assert_eq!(packet.size(), 1_040);
        assert_eq!(packet.sent_at(), SimTime::from_secs(1));
        assert_eq!(
            packet.to_string(),
            "[0x0000000000000001] n1:9 -> n2:9 (1040 bytes)"
        );
    }
}
