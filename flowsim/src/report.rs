use crate::Topology;
use flowsim_core::{
    app::Sample,
    flow_monitor::{FlowId, FlowKey, FlowStats, FlowTotals, RatioPolicy},
    stats::NetworkStats,
};
use std::{fmt, path::PathBuf, time::Duration};

const MBPS: f64 = 1_000_000.0;

/// Statistics of one flow at the end of a [`Scenario`] run.
///
/// [`Scenario`]: crate::Scenario
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub id: FlowId,
    pub key: FlowKey,
    pub stats: FlowStats,
    /// the last throughput sample of the flow's sink
    pub last_sample: Option<Sample>,
    /// the time series file of the flow, if any
    pub series: Option<PathBuf>,
}

/// What a [`Scenario`] run produced.
///
/// The [`Display`](fmt::Display) implementation prints one block per flow
/// followed by the totals of the simulation.
///
/// [`Scenario`]: crate::Scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub topology: Topology,
    pub simulation_time: Duration,
    pub ratio_policy: RatioPolicy,
    pub flows: Vec<FlowReport>,
    pub totals: FlowTotals,
    pub network: NetworkStats,
    /// number of throughput samples taken per flow
    pub samples: u64,
}

struct Ratio(Option<f64>);

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ratio) => write!(f, "{ratio}%"),
            None => f.write_str("n/a"),
        }
    }
}

struct Mbps(Option<f64>);

impl fmt::Display for Mbps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(bps) => write!(f, "{:.6} Mbps", bps / MBPS),
            None => f.write_str("n/a"),
        }
    }
}

impl FlowReport {
    /// Received bits per second, averaged over the whole simulation.
    pub fn throughput(&self, simulation_time: Duration) -> Option<f64> {
        self.stats.throughput_over(simulation_time)
    }
}

impl ScenarioReport {
    pub fn flow(&self, id: FlowId) -> Option<&FlowReport> {
        self.flows.iter().find(|flow| flow.id == id)
    }

    /// Mean over the flows of their throughput, in Mbps.
    pub fn average_throughput_mbps(&self) -> f64 {
        self.totals.average_throughput / MBPS
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = self.ratio_policy;
        let duration = self.simulation_time;

        writeln!(
            f,
            "Topology {} ({} nodes, {} links), {} of simulated time",
            self.topology,
            self.network.nodes.len(),
            self.network.links.len(),
            flowsim_core::time::Duration::new(duration),
        )?;

        for flow in &self.flows {
            let stats = &flow.stats;
            writeln!(f, "Flow {} ({})", flow.id, flow.key)?;
            writeln!(f, "  Tx Packets: {}", stats.tx_packets)?;
            writeln!(f, "  Tx Bytes:   {}", stats.tx_bytes)?;
            writeln!(f, "  TxOffered:  {}", Mbps(stats.offered_load_over(duration)))?;
            writeln!(f, "  Rx Packets: {}", stats.rx_packets)?;
            writeln!(f, "  Rx Bytes:   {}", stats.rx_bytes)?;
            writeln!(f, "  Lost Packets: {}", stats.not_received())?;
            writeln!(
                f,
                "  Packet delivery ratio: {}",
                Ratio(stats.delivery_ratio(policy))
            )?;
            writeln!(f, "  Packet loss ratio: {}", Ratio(stats.loss_ratio(policy)))?;
            writeln!(f, "  Delay: {:?}", stats.delay_sum)?;
            writeln!(f, "  Jitter: {:?}", stats.jitter_sum)?;
            writeln!(f, "  Throughput: {}", Mbps(stats.throughput_over(duration)))?;
            writeln!(
                f,
                "  Windowed throughput: {}",
                Mbps(stats.windowed_throughput())
            )?;
            if let Some(series) = &flow.series {
                writeln!(f, "  Time series: {}", series.display())?;
            }
        }

        let totals = &self.totals;
        writeln!(f, "--------Total Results of the simulation----------")?;
        writeln!(f, "Total sent packets: {}", totals.tx_packets)?;
        writeln!(f, "Total received packets: {}", totals.rx_packets)?;
        writeln!(f, "Total lost packets: {}", totals.lost_packets)?;
        writeln!(f, "Packet loss ratio: {}", Ratio(totals.loss_ratio(policy)))?;
        writeln!(
            f,
            "Packet delivery ratio: {}",
            Ratio(totals.delivery_ratio(policy))
        )?;
        writeln!(
            f,
            "Average throughput: {:.6} Mbps",
            self.average_throughput_mbps()
        )?;
        write!(f, "Dropped by the links: {}", self.network.dropped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_display() {
        assert_eq!(Ratio(Some(66.0)).to_string(), "66%");
        assert_eq!(Ratio(Some(12.5)).to_string(), "12.5%");
        assert_eq!(Ratio(None).to_string(), "n/a");
    }

    #[test]
    fn mbps_display() {
        assert_eq!(Mbps(Some(1_500_000.0)).to_string(), "1.500000 Mbps");
        assert_eq!(Mbps(None).to_string(), "n/a");
    }
}
