mod address;
mod id;

use crate::defaults::EPHEMERAL_PORT_START;
use std::collections::BTreeSet;

pub use self::{
    address::{Address, AddressParseError},
    id::NodeId,
};

/// A host in the simulated network.
///
/// A node only keeps track of the ports in use by its sockets and sinks;
/// links and routes are owned by the [`Network`].
///
/// [`Network`]: crate::network::Network
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    ports: BTreeSet<u16>,
    next_ephemeral: u16,
}

impl Node {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            ports: BTreeSet::new(),
            next_ephemeral: EPHEMERAL_PORT_START,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Reserve `port`. Returns `false` if it is already in use.
    pub(crate) fn reserve_port(&mut self, port: u16) -> bool {
        self.ports.insert(port)
    }

    /// Reserve the next free ephemeral port, wrapping around within the
    /// ephemeral range. Returns `None` once the range is exhausted.
    pub(crate) fn allocate_ephemeral_port(&mut self) -> Option<u16> {
        let range = u16::MAX - EPHEMERAL_PORT_START + 1;
        for _ in 0..range {
            let port = self.next_ephemeral;
            self.next_ephemeral = if port == u16::MAX {
                EPHEMERAL_PORT_START
            } else {
                port + 1
            };
            if self.ports.insert(port) {
                return Some(port);
            }
        }
        None
    }

    pub(crate) fn release_port(&mut self, port: u16) {
        self.ports.remove(&port);
    }

    pub fn address(&self, port: u16) -> Address {
        Address::new(self.id, port)
    }
}
