use crate::ScenarioConfig;
use anyhow::{Result, bail};
use flowsim_core::{
    measure::{Bandwidth, Latency, PacketLoss},
    network::Network,
    node::NodeId,
};
use std::{fmt, str::FromStr};

/// The shape of the network a [`Scenario`] runs on.
///
/// Every topology has a bottleneck the flows compete for:
///
/// * `Chain`: `n0 - n1 - ... - n{hops}`, one flow end to end; the first
///   link is the sender's access link and every other link is a
///   bottleneck (the single link when `hops` is 1);
/// * `Dumbbell`: `pairs` senders behind router `r1`, `pairs` receivers
///   behind router `r2` and the bottleneck `r1 - r2`; flow `i` goes from
///   sender `i` to receiver `i`;
/// * `Star`: `stations` hosts around a hub, the hub connected to a
///   server through the bottleneck; every station sends to the server.
///
/// [`Scenario`]: crate::Scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Chain { hops: usize },
    Dumbbell { pairs: usize },
    Star { stations: usize },
}

/// A sender and a receiver of the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowEnds {
    pub sender: NodeId,
    pub receiver: NodeId,
}

struct LinkParams {
    bandwidth: Bandwidth,
    latency: Latency,
    packet_loss: PacketLoss,
    queue_limit: usize,
}

impl LinkParams {
    fn access(config: &ScenarioConfig) -> Self {
        Self {
            bandwidth: config.access_bandwidth,
            latency: config.access_latency,
            packet_loss: PacketLoss::NONE,
            queue_limit: config.queue_limit,
        }
    }

    fn bottleneck(config: &ScenarioConfig) -> Self {
        Self {
            bandwidth: config.bottleneck_bandwidth,
            latency: config.bottleneck_latency,
            packet_loss: config.bottleneck_loss,
            queue_limit: config.queue_limit,
        }
    }

    fn connect(&self, network: &mut Network, a: NodeId, b: NodeId) -> Result<()> {
        network
            .configure_link(a, b)
            .set_bandwidth(self.bandwidth)
            .set_latency(self.latency)
            .set_packet_loss(self.packet_loss)
            .set_queue_limit(self.queue_limit)
            .apply()?;
        Ok(())
    }
}

impl Topology {
    /// Number of flows, and so of sources and sinks.
    pub fn flows(&self) -> usize {
        match *self {
            Self::Chain { .. } => 1,
            Self::Dumbbell { pairs } => pairs,
            Self::Star { stations } => stations,
        }
    }

    /// Number of nodes, routers included.
    pub fn nodes(&self) -> usize {
        match *self {
            Self::Chain { hops } => hops + 1,
            Self::Dumbbell { pairs } => 2 * pairs + 2,
            Self::Star { stations } => stations + 2,
        }
    }

    /// Add the nodes and links to `network`.
    pub fn build(&self, network: &mut Network, config: &ScenarioConfig) -> Result<Vec<FlowEnds>> {
        if self.flows() == 0 || matches!(self, Self::Chain { hops: 0 }) {
            bail!("The {self} topology has no flow");
        }

        let access = LinkParams::access(config);
        let bottleneck = LinkParams::bottleneck(config);

        let flows = match *self {
            Self::Chain { hops } => {
                let nodes = network.add_nodes(hops + 1);
                for (i, pair) in nodes.windows(2).enumerate() {
                    let params = if i == 0 && hops > 1 {
                        &access
                    } else {
                        &bottleneck
                    };
                    params.connect(network, pair[0], pair[1])?;
                }
                vec![FlowEnds {
                    sender: nodes[0],
                    receiver: nodes[hops],
                }]
            }
            Self::Dumbbell { pairs } => {
                let left = network.add_node();
                let right = network.add_node();
                bottleneck.connect(network, left, right)?;

                let mut flows = Vec::with_capacity(pairs);
                for _ in 0..pairs {
                    let sender = network.add_node();
                    let receiver = network.add_node();
                    access.connect(network, sender, left)?;
                    access.connect(network, right, receiver)?;
                    flows.push(FlowEnds { sender, receiver });
                }
                flows
            }
            Self::Star { stations } => {
                let hub = network.add_node();
                let server = network.add_node();
                bottleneck.connect(network, hub, server)?;

                network
                    .add_nodes(stations)
                    .into_iter()
                    .map(|station| {
                        access.connect(network, station, hub)?;
                        Ok(FlowEnds {
                            sender: station,
                            receiver: server,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        network.populate_routing_tables();
        Ok(flows)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain { hops } => write!(f, "chain:{hops}"),
            Self::Dumbbell { pairs } => write!(f, "dumbbell:{pairs}"),
            Self::Star { stations } => write!(f, "star:{stations}"),
        }
    }
}

impl FromStr for Topology {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, count) = s.split_once(':').unwrap_or((s, "1"));
        let count: usize = count.trim().parse()?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "chain" => Ok(Self::Chain { hops: count }),
            "dumbbell" => Ok(Self::Dumbbell { pairs: count }),
            "star" => Ok(Self::Star { stations: count }),
            other => bail!("Unknown topology `{other}', expected chain, dumbbell or star"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(topology: Topology) -> (Network, Vec<FlowEnds>) {
        let mut network = Network::new();
        let flows = topology
            .build(&mut network, &ScenarioConfig::default())
            .unwrap();
        (network, flows)
    }

    #[test]
    fn chain() {
        let (network, flows) = build(Topology::Chain { hops: 3 });

        assert_eq!(network.nodes().count(), 4);
        assert_eq!(flows.len(), 1);
        let path = network.path(flows[0].sender, flows[0].receiver).unwrap();
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn dumbbell_shares_the_bottleneck() {
        let (network, flows) = build(Topology::Dumbbell { pairs: 3 });
        assert_eq!(network.nodes().count(), Topology::Dumbbell { pairs: 3 }.nodes());
        assert_eq!(flows.len(), 3);

        let (left, right) = (NodeId::new(1), NodeId::new(2));
        for flow in flows {
            let path = network.path(flow.sender, flow.receiver).unwrap();
            assert_eq!(path, vec![flow.sender, left, right, flow.receiver]);
        }
    }

    #[test]
    fn star_converges_on_the_server() {
        let (network, flows) = build(Topology::Star { stations: 4 });
        let server = flows[0].receiver;
        assert!(flows.iter().all(|flow| flow.receiver == server));
        assert_eq!(network.path(flows[3].sender, server).unwrap().len(), 3);
    }

    #[test]
    fn empty_topologies() {
        let mut network = Network::new();
        let config = ScenarioConfig::default();
        assert!(Topology::Chain { hops: 0 }.build(&mut network, &config).is_err());
        assert!(Topology::Star { stations: 0 }.build(&mut network, &config).is_err());
    }

    #[test]
    fn parse() {
        assert_eq!(
            "dumbbell:4".parse::<Topology>().unwrap(),
            Topology::Dumbbell { pairs: 4 }
        );
        assert_eq!("chain".parse::<Topology>().unwrap(), Topology::Chain { hops: 1 });
        assert_eq!(
            Topology::Star { stations: 9 }.to_string().parse::<Topology>().unwrap(),
            Topology::Star { stations: 9 }
        );
        assert!("ring:3".parse::<Topology>().is_err());
    }
}
