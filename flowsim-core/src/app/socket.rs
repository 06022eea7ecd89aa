use crate::node::Address;
use std::fmt;
use thiserror::Error;

/// A connectionless datagram socket.
///
/// Sockets are created by the [`Simulation`] on a node, with an ephemeral
/// local port already reserved, and handed to the application that owns
/// them. The socket only records where datagrams come from and go to: it
/// does no retransmission and keeps no transport state.
///
/// ```
/// # use flowsim_core::{app::{Socket, SocketError}, node::{Address, NodeId}};
/// let mut socket = Socket::new(Address::new(NodeId::ONE, 49153));
/// assert_eq!(socket.datagram(100), Err(SocketError::NotConnected));
///
/// socket.connect(Address::new(NodeId::new(2), 8080)).unwrap();
/// let datagram = socket.datagram(100).unwrap();
/// assert_eq!(datagram.destination.port, 8080);
///
/// socket.close();
/// assert_eq!(socket.datagram(100), Err(SocketError::Closed));
/// ```
///
/// [`Simulation`]: crate::sim::Simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socket {
    local: Address,
    peer: Option<Address>,
    state: SocketState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketState {
    Open,
    Bound,
    Closed,
}

/// A datagram ready to be handed to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram {
    pub source: Address,
    pub destination: Address,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("Socket is not connected to a peer")]
    NotConnected,
    #[error("Socket is closed")]
    Closed,
}

impl Socket {
    pub fn new(local: Address) -> Self {
        Self {
            local,
            peer: None,
            state: SocketState::Open,
        }
    }

    pub fn local(&self) -> Address {
        self.local
    }

    pub fn peer(&self) -> Option<Address> {
        self.peer
    }

    pub fn is_bound(&self) -> bool {
        self.state == SocketState::Bound
    }

    pub fn is_closed(&self) -> bool {
        self.state == SocketState::Closed
    }

    /// Bind the socket to its local address.
    pub fn bind(&mut self) -> Result<(), SocketError> {
        if self.is_closed() {
            return Err(SocketError::Closed);
        }
        self.state = SocketState::Bound;
        Ok(())
    }

    /// Set the default destination of the socket, binding it if needed.
    pub fn connect(&mut self, peer: Address) -> Result<(), SocketError> {
        self.bind()?;
        self.peer = Some(peer);
        Ok(())
    }

    /// Close the socket. Closing twice is harmless.
    pub fn close(&mut self) {
        self.state = SocketState::Closed;
    }

    /// Prepare a datagram of `size` bytes for the connected peer.
    pub fn datagram(&self, size: u64) -> Result<Datagram, SocketError> {
        if self.is_closed() {
            return Err(SocketError::Closed);
        }
        let destination = self.peer.ok_or(SocketError::NotConnected)?;

        Ok(Datagram {
            source: self.local,
            destination,
            size,
        })
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peer {
            Some(peer) => write!(f, "{} -> {}", self.local, peer),
            None => write!(f, "{}", self.local),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn local() -> Address {
        Address::new(NodeId::ONE, 49_153)
    }

    #[test]
    fn connect_binds() {
        let mut socket = Socket::new(local());
        assert!(!socket.is_bound());

        socket.connect(Address::new(NodeId::new(3), 8080)).unwrap();
        assert!(socket.is_bound());
        assert_eq!(socket.to_string(), "n1:49153 -> n3:8080");
    }

    #[test]
    fn closed_socket_cannot_be_reused() {
        let mut socket = Socket::new(local());
        socket.close();
        socket.close();

        assert_eq!(socket.bind(), Err(SocketError::Closed));
        assert_eq!(
            socket.connect(Address::new(NodeId::new(3), 8080)),
            Err(SocketError::Closed)
        );
    }

    #[test]
    fn datagram_addresses() {
        let mut socket = Socket::new(local());
        let peer = Address::new(NodeId::new(2), 9);
        socket.connect(peer).unwrap();

        assert_eq!(
            socket.datagram(1_040),
            Ok(Datagram {
                source: local(),
                destination: peer,
                size: 1_040,
            })
        );
    }
}
