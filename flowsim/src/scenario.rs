use crate::{
    FlowReport, ScenarioConfig, ScenarioReport, Topology,
    output::create_series,
};
use anyhow::{Context as _, Result, anyhow};
use flowsim_core::{
    Simulation,
    app::{SinkId, ThroughputSampler, TrafficSource},
    sim::SamplerId,
    node::Address,
};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info};

/// First port the sinks listen on, flow `i` uses `SINK_PORT + i`.
pub const SINK_PORT: u16 = 8080;

/// A complete experiment: a [`Topology`], one source and one sink per
/// flow, a throughput sampler watching every sink and the flow monitor.
///
/// ```
/// use flowsim::{Scenario, ScenarioConfig, Topology};
/// use std::time::Duration;
///
/// let config = ScenarioConfig {
///     simulation_time: Duration::from_secs(3),
///     packet_budget: 100,
///     ..ScenarioConfig::default()
/// };
/// let report = Scenario::new(config, Topology::Dumbbell { pairs: 2 })
///     .run()
///     .unwrap();
///
/// assert_eq!(report.flows.len(), 2);
/// assert_eq!(report.totals.tx_packets, 200);
/// ```
#[derive(Debug, Clone)]
pub struct Scenario {
    config: ScenarioConfig,
    topology: Topology,
    start_offsets: Vec<Duration>,
}

impl Scenario {
    pub fn new(config: ScenarioConfig, topology: Topology) -> Self {
        Self {
            config,
            topology,
            start_offsets: Vec::new(),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Delay the start of flow `i` by `offsets[i]` after
    /// [`ScenarioConfig::source_start`]. Missing offsets are zero.
    pub fn with_start_offsets(mut self, offsets: Vec<Duration>) -> Self {
        self.start_offsets = offsets;
        self
    }

    /// Build the simulation, run it to the end and collect the report.
    pub fn run(&self) -> Result<ScenarioReport> {
        let config = &self.config;
        config.validate()?;

        let mut sim = Simulation::new();
        sim.network_mut().set_seed(config.seed);
        let flows = self.topology.build(sim.network_mut(), config)?;
        info!(
            topology = %self.topology,
            flows = flows.len(),
            "scenario built, running for {}",
            flowsim_core::time::Duration::new(config.simulation_time)
        );

        let mut sinks: Vec<SinkId> = Vec::with_capacity(flows.len());
        for (i, ends) in flows.iter().enumerate() {
            let port = u16::try_from(i)
                .ok()
                .and_then(|i| SINK_PORT.checked_add(i))
                .ok_or_else(|| anyhow!("Too many flows ({}) for the sink ports", flows.len()))?;
            let destination = Address::new(ends.receiver, port);
            sinks.push(sim.install_sink(destination)?);

            let socket = sim.create_socket(ends.sender)?;
            let mut source = TrafficSource::new();
            source.configure(
                socket,
                destination,
                config.packet_size,
                config.packet_budget,
                config.data_rate,
            )?;

            let offset = self.start_offsets.get(i).copied().unwrap_or_default();
            let start = config.source_start + offset;
            debug!(flow = i, %destination, "source starts at {start}");
            sim.install_source(source)?
                .start_at(start)
                .stop_at(config.stop_time());
        }

        let (series, streams) = match &config.output_dir {
            Some(dir) => {
                let (paths, streams) = create_series(dir, &config.file_prefix, sinks.len())?;
                (paths.into_iter().map(Some).collect(), streams)
            }
            None => (vec![None; sinks.len()], sinks.iter().map(|_| None).collect()),
        };
        let mut sampler =
            ThroughputSampler::new(sinks.clone(), config.sample_period, config.unit, streams)?;
        if !config.console {
            sampler.quiet();
        }
        let sampler = sim.install_sampler(sampler)?;
        sim.start_sampler(sampler, config.sampler_start)?;

        sim.enable_flow_monitor();
        sim.stop_at(config.stop_time());
        sim.run().context("Simulation failed")?;

        self.report(&sim, sampler, &sinks, series)
    }

    fn report(
        &self,
        sim: &Simulation,
        sampler: SamplerId,
        sinks: &[SinkId],
        series: Vec<Option<PathBuf>>,
    ) -> Result<ScenarioReport> {
        let monitor = sim
            .flow_monitor()
            .ok_or_else(|| anyhow!("Flow monitor is not enabled"))?;
        let sampler = sim
            .sampler(sampler)
            .ok_or_else(|| anyhow!("Throughput sampler is not installed"))?;

        let mut flows = Vec::with_capacity(sinks.len());
        for (i, sink) in sinks.iter().enumerate() {
            let Some(destination) = sim.sink(*sink).map(|sink| sink.address()) else {
                continue;
            };
            let Some((id, key, stats)) = monitor
                .flows()
                .find(|(_, key, _)| key.destination == destination)
            else {
                // the source never sent anything
                continue;
            };

            flows.push(FlowReport {
                id,
                key: *key,
                stats: stats.clone(),
                last_sample: (sampler.invocations() > 0).then(|| sampler.last_samples()[i]),
                series: series.get(i).cloned().flatten(),
            });
        }

        Ok(ScenarioReport {
            topology: self.topology,
            simulation_time: self.config.simulation_time,
            ratio_policy: self.config.ratio_policy,
            flows,
            totals: monitor.totals(self.config.simulation_time),
            network: sim.network().stats(),
            samples: sampler.invocations(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsim_core::measure::Bandwidth;

    fn short(config: ScenarioConfig) -> ScenarioConfig {
        ScenarioConfig {
            simulation_time: Duration::from_secs(4),
            ..config
        }
    }

    #[test]
    fn chain_delivers_the_budget() {
        let config = short(ScenarioConfig {
            packet_budget: 50,
            ..ScenarioConfig::default()
        });
        let report = Scenario::new(config, Topology::Chain { hops: 3 })
            .run()
            .unwrap();

        assert_eq!(report.flows.len(), 1);
        let flow = &report.flows[0];
        assert_eq!(flow.stats.tx_packets, 50);
        assert_eq!(flow.stats.rx_packets, 50);
        assert_eq!(flow.key.destination.port, SINK_PORT);
        // 1.1, 1.6, ..., 3.6
        assert_eq!(report.samples, 6);
    }

    #[test]
    fn overloaded_bottleneck_drops() {
        let config = short(ScenarioConfig {
            data_rate: Bandwidth::new(4_000_000),
            bottleneck_bandwidth: Bandwidth::new(2_000_000),
            queue_limit: 10,
            ..ScenarioConfig::default()
        });
        let report = Scenario::new(config, Topology::Dumbbell { pairs: 2 })
            .run()
            .unwrap();

        assert_eq!(report.flows.len(), 2);
        assert!(report.network.dropped() > 0);
        assert!(report.totals.lost_packets > 0);
        // the bottleneck caps the sum of the flows
        assert!(report.average_throughput_mbps() * 2.0 <= 2.0);
    }

    #[test]
    fn start_offsets() {
        let config = short(ScenarioConfig {
            packet_budget: 1,
            ..ScenarioConfig::default()
        });
        let report = Scenario::new(config, Topology::Star { stations: 2 })
            .with_start_offsets(vec![Duration::ZERO, Duration::from_millis(500)])
            .run()
            .unwrap();

        let first_tx: Vec<_> = report
            .flows
            .iter()
            .map(|flow| flow.stats.first_tx.unwrap().as_secs_f64())
            .collect();
        assert_eq!(first_tx, vec![1.0, 1.5]);
    }

    #[test]
    fn invalid_config() {
        let config = ScenarioConfig {
            simulation_time: Duration::ZERO,
            ..ScenarioConfig::default()
        };
        assert!(Scenario::new(config, Topology::Chain { hops: 1 }).run().is_err());
    }
}
