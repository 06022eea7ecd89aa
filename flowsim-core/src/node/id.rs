use std::{fmt, num::ParseIntError, str};

/// The identifier of a node in the [`Network`].
///
/// Identifiers are handed out sequentially starting at `1`;
/// [`NodeId::ZERO`] is never assigned to a node.
///
/// [`Network`]: crate::network::Network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub const ZERO: Self = NodeId::new(0);
    pub const ONE: Self = NodeId::new(1);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_u64(self) -> u64 {
        self.0
    }

    #[must_use = "function does not modify the current value"]
    pub(crate) fn next(self) -> Self {
        Self::new(self.0 + 1)
    }
}

impl str::FromStr for NodeId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('n').parse().map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print() {
        assert_eq!(NodeId(42).to_string(), "n42");
    }

    #[test]
    fn parse() {
        assert_eq!("42".parse::<NodeId>().unwrap(), NodeId(42));
        assert_eq!("n7".parse::<NodeId>().unwrap(), NodeId(7));
        assert!("x".parse::<NodeId>().is_err());
    }

    #[test]
    fn next() {
        assert_eq!(NodeId::ZERO.next(), NodeId::ONE);
    }
}
