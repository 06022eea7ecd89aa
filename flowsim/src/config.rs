use flowsim_core::{
    app::ThroughputUnit,
    defaults::{DEFAULT_QUEUE_LIMIT, DEFAULT_SAMPLE_PERIOD},
    flow_monitor::RatioPolicy,
    measure::{Bandwidth, Latency, PacketLoss},
    time::SimTime,
};
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Everything a [`Scenario`] needs besides its [`Topology`].
///
/// The defaults reproduce the classic setup: 5Mbps links with 30ms of
/// delay, 1040 bytes datagrams, sources starting at 1s and a throughput
/// sample every 500ms starting at 1.1s, for 20s of simulated time.
///
/// ```
/// # use flowsim::ScenarioConfig;
/// let config = ScenarioConfig {
///     packet_budget: 1_000,
///     data_rate: "1Mbps".parse().unwrap(),
///     ..ScenarioConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
///
/// [`Scenario`]: crate::Scenario
/// [`Topology`]: crate::Topology
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// the simulation stops at this instant
    pub simulation_time: Duration,

    /// links between the end hosts and the routers
    pub access_bandwidth: Bandwidth,
    pub access_latency: Latency,

    /// the link(s) shared by every flow
    pub bottleneck_bandwidth: Bandwidth,
    pub bottleneck_latency: Latency,
    pub bottleneck_loss: PacketLoss,

    /// datagrams waiting for a link transmitter, per direction
    pub queue_limit: usize,

    pub packet_size: u64,
    /// datagrams sent by each source, `0` for no limit
    pub packet_budget: u64,
    /// sending rate of each source
    pub data_rate: Bandwidth,
    pub source_start: SimTime,

    pub sampler_start: SimTime,
    pub sample_period: Duration,
    pub unit: ThroughputUnit,

    /// seed of the packet loss draws
    pub seed: u64,

    /// where to write one `<file_prefix>_<i>.dat` time series per flow
    pub output_dir: Option<PathBuf>,
    pub file_prefix: String,

    /// print a line per flow and per sample on the standard output
    pub console: bool,

    pub ratio_policy: RatioPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Simulation time must be greater than 0s")]
    NoSimulationTime,
    #[error("Sources start at {start}, after the end of the simulation ({end})")]
    StartAfterEnd { start: SimTime, end: SimTime },
    #[error("Packet size must be at least 1 byte")]
    ZeroPacketSize,
    #[error("Data rate must be greater than 0bps")]
    ZeroDataRate,
    #[error("Sampling period must be greater than 0")]
    ZeroSamplePeriod,
    #[error("File prefix `{0}' must be a plain file name")]
    InvalidPrefix(String),
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            simulation_time: Duration::from_secs(20),
            access_bandwidth: Bandwidth::new(5_000_000),
            access_latency: Latency::from_millis(30),
            bottleneck_bandwidth: Bandwidth::new(5_000_000),
            bottleneck_latency: Latency::from_millis(30),
            bottleneck_loss: PacketLoss::NONE,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            packet_size: 1_040,
            packet_budget: 0,
            data_rate: Bandwidth::new(1_000_000),
            source_start: SimTime::from_secs(1),
            sampler_start: SimTime::from_millis(1_100),
            sample_period: DEFAULT_SAMPLE_PERIOD,
            unit: ThroughputUnit::Mbps,
            seed: 0,
            output_dir: None,
            file_prefix: "throughput".to_owned(),
            console: false,
            ratio_policy: RatioPolicy::Truncated,
        }
    }
}

impl ScenarioConfig {
    pub fn stop_time(&self) -> SimTime {
        SimTime::from(self.simulation_time)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_time.is_zero() {
            return Err(ConfigError::NoSimulationTime);
        }
        if self.source_start >= self.stop_time() {
            return Err(ConfigError::StartAfterEnd {
                start: self.source_start,
                end: self.stop_time(),
            });
        }
        if self.packet_size == 0 {
            return Err(ConfigError::ZeroPacketSize);
        }
        if self.data_rate.is_zero() {
            return Err(ConfigError::ZeroDataRate);
        }
        if self.sample_period.is_zero() {
            return Err(ConfigError::ZeroSamplePeriod);
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::InvalidPrefix(self.file_prefix.clone()));
        }
        Ok(())
    }
}
