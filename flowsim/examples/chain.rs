//! The classic two hop chain: `n0 - n1 - n2`, a 1Mbps source on `n0`
//! sending 1000 datagrams of 1040 bytes to a sink on `n2`, throughput
//! printed every 500ms.
//!
//! ```text
//! cargo run --example chain -p flowsim
//! ```

use anyhow::Result;
use clap::Parser;
use flowsim::{Bandwidth, Latency, Scenario, ScenarioConfig, Topology};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Command {
    #[arg(long, default_value = "2")]
    hops: usize,

    /// simulated seconds
    #[arg(long, default_value = "20")]
    time: u64,

    #[arg(long, default_value = "5mbps")]
    bandwidth: Bandwidth,

    #[arg(long, default_value = "30ms")]
    delay: Latency,

    #[arg(long, default_value = "1000")]
    budget: u64,

    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cmd = Command::parse();

    let config = ScenarioConfig {
        simulation_time: Duration::from_secs(cmd.time),
        access_bandwidth: cmd.bandwidth,
        access_latency: cmd.delay,
        bottleneck_bandwidth: cmd.bandwidth,
        bottleneck_latency: cmd.delay,
        packet_budget: cmd.budget,
        output_dir: cmd.output_dir,
        console: true,
        ..ScenarioConfig::default()
    };

    let report = Scenario::new(config, Topology::Chain { hops: cmd.hops }).run()?;
    println!("{report}");

    Ok(())
}
