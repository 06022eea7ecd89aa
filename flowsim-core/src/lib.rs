//! Deterministic discrete-event simulation of datagram traffic over
//! point-to-point networks.
//!
//! A [`Simulation`] drives a [`Network`] of nodes and full-duplex links in
//! simulated time. Applications installed on the nodes exchange datagrams:
//!
//! * the [`TrafficSource`] sends fixed-size datagrams at a constant rate
//!   until its packet budget is exhausted or it is stopped;
//! * the [`PacketSink`] counts what it receives;
//! * the [`ThroughputSampler`] periodically turns the sinks' counters
//!   into throughput time series.
//!
//! The [`FlowMonitor`] keeps per-flow statistics (throughput, delivery
//! ratio, delay, jitter) for the end of run report.
//!
//! Nothing here reads the wall clock: two runs with the same topology,
//! applications and seed produce the same events in the same order.
//!
//! [`Simulation`]: sim::Simulation
//! [`Network`]: network::Network
//! [`TrafficSource`]: app::TrafficSource
//! [`PacketSink`]: app::PacketSink
//! [`ThroughputSampler`]: app::ThroughputSampler
//! [`FlowMonitor`]: flow_monitor::FlowMonitor

pub mod app;
pub mod defaults;
pub mod flow_monitor;
pub mod link;
pub mod measure;
pub mod network;
pub mod node;
pub mod scheduler;
pub mod sim;
pub mod stats;
pub mod time;

pub use self::{
    sim::{SimError, Simulation},
    time::SimTime,
};
