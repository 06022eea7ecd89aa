/*!
# Flow simulator

Ready made experiments on top of [`flowsim_core`]: pick a [`Topology`],
tune a [`ScenarioConfig`] and [`Scenario::run`] it. Every flow gets a
constant rate source and a sink, a throughput sampler writes one time
series per flow and the flow monitor produces the [`ScenarioReport`].

```
use flowsim::{Scenario, ScenarioConfig, Topology};

let report = Scenario::new(ScenarioConfig::default(), Topology::Chain { hops: 2 })
    .run()
    .unwrap();

println!("{report}");
```
*/

mod config;
pub mod output;
mod report;
mod scenario;
mod topology;

// convenient re-export of `flowsim_core` objects used to configure a scenario
pub use flowsim_core::{
    self,
    app::ThroughputUnit,
    flow_monitor::RatioPolicy,
    measure::{Bandwidth, Latency, PacketLoss},
    time::SimTime,
};

pub use self::{
    config::{ConfigError, ScenarioConfig},
    report::{FlowReport, ScenarioReport},
    scenario::{SINK_PORT, Scenario},
    topology::{FlowEnds, Topology},
};
