use crate::node::NodeId;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A transport endpoint: a node and a port on that node.
///
/// ```
/// # use flowsim_core::node::{Address, NodeId};
/// let sink: Address = "n4:8080".parse().unwrap();
/// assert_eq!(sink, Address::new(NodeId::new(4), 8080));
/// assert_eq!(sink.to_string(), "n4:8080");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    pub node: NodeId,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address `{0}', expected `<node>:<port>'")]
pub struct AddressParseError(String);

impl Address {
    pub const fn new(node: NodeId, port: u16) -> Self {
        Self { node, port }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || AddressParseError(s.to_owned());

        let (node, port) = s.split_once(':').ok_or_else(error)?;
        let node = node.parse().map_err(|_| error())?;
        let port = port.parse().map_err(|_| error())?;

        Ok(Self { node, port })
    }
}
