//! Run one of the built-in topologies from the command line.
//!
//! ```text
//! cargo run --example scenario -p flowsim -- --topology dumbbell:4 \
//!     --bottleneck-bandwidth 2mbps --rate 1mbps --output-dir out
//! ```
//!
//! Set `RUST_LOG=debug` to follow the simulation.

use anyhow::Result;
use clap::Parser;
use flowsim::{
    Bandwidth, Latency, PacketLoss, RatioPolicy, Scenario, ScenarioConfig, SimTime,
    ThroughputUnit, Topology, flowsim_core::time::Duration,
};
use rand::Rng as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Command {
    /// `chain:<hops>`, `dumbbell:<pairs>` or `star:<stations>`
    #[arg(long, default_value = "chain:1")]
    topology: Topology,

    #[arg(long, default_value = "20s")]
    time: Duration,

    #[arg(long, default_value = "5mbps")]
    access_bandwidth: Bandwidth,
    #[arg(long, default_value = "30ms")]
    access_delay: Latency,

    #[arg(long, default_value = "5mbps")]
    bottleneck_bandwidth: Bandwidth,
    #[arg(long, default_value = "30ms")]
    bottleneck_delay: Latency,
    #[arg(long, default_value = "0%")]
    loss: PacketLoss,

    /// datagrams waiting per link direction
    #[arg(long, default_value = "100")]
    queue: usize,

    /// datagram size in bytes
    #[arg(long, default_value = "1040")]
    packet_size: u64,
    /// datagrams per source, 0 for no limit
    #[arg(long, default_value = "0")]
    budget: u64,
    #[arg(long, default_value = "1mbps")]
    rate: Bandwidth,

    /// randomly delay the start of each source by up to this much
    #[arg(long)]
    jitter: Option<Duration>,

    #[arg(long, default_value = "500ms")]
    sample_period: Duration,
    /// report throughput in Kbit/s instead of Mbit/s
    #[arg(long)]
    kbps: bool,

    #[arg(long, default_value = "0")]
    seed: u64,

    /// write one time series per flow in this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long, default_value = "throughput")]
    prefix: String,

    /// print every throughput sample
    #[arg(long)]
    console: bool,

    /// compute the ratios without truncating them to whole percents
    #[arg(long)]
    exact: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = Command::parse();

    let config = ScenarioConfig {
        simulation_time: cmd.time.into_duration(),
        access_bandwidth: cmd.access_bandwidth,
        access_latency: cmd.access_delay,
        bottleneck_bandwidth: cmd.bottleneck_bandwidth,
        bottleneck_latency: cmd.bottleneck_delay,
        bottleneck_loss: cmd.loss,
        queue_limit: cmd.queue,
        packet_size: cmd.packet_size,
        packet_budget: cmd.budget,
        data_rate: cmd.rate,
        sample_period: cmd.sample_period.into_duration(),
        unit: if cmd.kbps {
            ThroughputUnit::Kbps
        } else {
            ThroughputUnit::Mbps
        },
        seed: cmd.seed,
        output_dir: cmd.output_dir,
        file_prefix: cmd.prefix,
        console: cmd.console,
        ratio_policy: if cmd.exact {
            RatioPolicy::Exact
        } else {
            RatioPolicy::Truncated
        },
        ..ScenarioConfig::default()
    };

    let mut scenario = Scenario::new(config, cmd.topology);
    if let Some(jitter) = cmd.jitter {
        let jitter = jitter.into_duration();
        let mut rng = rand::thread_rng();
        let offsets = (0..cmd.topology.flows())
            .map(|_| jitter.mul_f64(rng.gen_range(0.0..1.0)))
            .collect();
        scenario = scenario.with_start_offsets(offsets);
    }

    let report = scenario.run()?;
    println!("{report}");

    let end = SimTime::from(report.simulation_time);
    for flow in &report.flows {
        if let Some(sample) = flow.last_sample {
            println!(
                "flow {}: last sample at {} of {end}, {:.6}",
                flow.id, sample.time, sample.value
            );
        }
    }

    Ok(())
}
