//! The simulation host: owns the clock, the network and the applications
//! and dispatches every event in time order.

mod context;

use self::context::SourceContext;
use crate::{
    app::{
        Datagram, PacketSink, RxCounter, SamplerError, SinkId, Socket, SourceError,
        ThroughputSampler, TrafficSource,
    },
    flow_monitor::FlowMonitor,
    link::DropReason,
    network::{Hop, Network, Packet, RouteError},
    node::{Address, NodeId},
    scheduler::Scheduler,
    time::SimTime,
};
use std::{collections::HashMap, fmt, io};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Identifier of a [`TrafficSource`] installed in a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(usize);

/// Identifier of a [`ThroughputSampler`] installed in a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SamplerId(usize);

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("Traffic source {id} failed")]
    Source {
        id: SourceId,
        #[source]
        error: SourceError,
    },
    #[error(transparent)]
    Sampler(#[from] SamplerError),
    #[error("Address {0} is already in use")]
    AddressInUse(Address),
    #[error("No free port left on node {0}")]
    PortsExhausted(NodeId),
    #[error("Unknown sink {0}")]
    UnknownSink(SinkId),
    #[error("Unknown sampler {0}")]
    UnknownSampler(SamplerId),
    #[error("A periodic sampler is started but the simulation has no stop time")]
    Unbounded,
    #[error("Cannot flush the sampler outputs")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
enum Event {
    SourceStart(SourceId),
    SourceStop(SourceId),
    SourceTimer(SourceId),
    SamplerTick(SamplerId),
    /// `packet` reached `node`
    Arrival { packet: Packet, node: NodeId },
}

/// What the applications' callbacks may touch while they run.
struct Core {
    scheduler: Scheduler<Event>,
    network: Network,
    flow_monitor: Option<FlowMonitor>,
}

/// A discrete-event simulation of applications exchanging datagrams
/// over a [`Network`].
///
/// # Example
///
/// ```
/// use flowsim_core::{
///     app::TrafficSource,
///     measure::{Bandwidth, Latency},
///     node::Address,
///     sim::Simulation,
///     time::SimTime,
/// };
///
/// let mut sim = Simulation::new();
/// let (n0, n1) = {
///     let network = sim.network_mut();
///     let n0 = network.add_node();
///     let n1 = network.add_node();
///     network
///         .configure_link(n0, n1)
///         .set_bandwidth(Bandwidth::new(1_000_000))
///         .set_latency(Latency::from_millis(10))
///         .apply()
///         .unwrap();
///     (n0, n1)
/// };
///
/// let sink = sim.install_sink(Address::new(n1, 8080)).unwrap();
///
/// let mut source = TrafficSource::new();
/// let socket = sim.create_socket(n0).unwrap();
/// source
///     .configure(socket, Address::new(n1, 8080), 1_040, 10, Bandwidth::new(1_000_000))
///     .unwrap();
/// sim.install_source(source).unwrap().start_at(SimTime::from_secs(1));
///
/// sim.stop_at(SimTime::from_secs(5));
/// sim.run().unwrap();
///
/// assert_eq!(sim.sink(sink).unwrap().received_packets(), 10);
/// ```
pub struct Simulation {
    core: Core,
    sources: Vec<TrafficSource>,
    sinks: Vec<PacketSink>,
    listeners: HashMap<Address, SinkId>,
    samplers: Vec<ThroughputSampler>,
    samplers_started: bool,
    stop_time: Option<SimTime>,
}

/// Returned by [`Simulation::install_source`] to schedule the start and
/// stop of the source.
pub struct SourceHandle<'a> {
    sim: &'a mut Simulation,
    id: SourceId,
}

impl SourceHandle<'_> {
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Start the source at `time`.
    pub fn start_at(self, time: SimTime) -> Self {
        self.sim
            .core
            .scheduler
            .schedule_at(time, Event::SourceStart(self.id));
        self
    }

    /// Stop the source at `time`.
    pub fn stop_at(self, time: SimTime) -> Self {
        self.sim
            .core
            .scheduler
            .schedule_at(time, Event::SourceStop(self.id));
        self
    }
}

impl Core {
    fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    fn send(&mut self, datagram: Datagram) {
        let now = self.now();
        let packet = match Packet::builder(self.network.packet_id_generator())
            .from(datagram.source)
            .to(datagram.destination)
            .size(datagram.size)
            .sent_at(now)
            .build()
        {
            Ok(packet) => packet,
            Err(error) => {
                warn!(%error, "cannot build packet");
                return;
            }
        };

        if let Some(monitor) = self.flow_monitor.as_mut() {
            monitor.record_tx(&packet, now);
        }
        trace!(%packet, "sent at {now}");

        let at = datagram.source.node;
        if at == datagram.destination.node {
            self.scheduler
                .schedule_now(Event::Arrival { packet, node: at });
        } else {
            self.forward(packet, at);
        }
    }

    fn forward(&mut self, packet: Packet, at: NodeId) {
        let now = self.now();
        match self.network.transmit(&packet, at, now) {
            Hop::Arrive { node, at: arrival } => {
                self.scheduler
                    .schedule_at(arrival, Event::Arrival { packet, node });
            }
            Hop::Dropped(reason) => self.drop_packet(&packet, at, reason),
        }
    }

    fn drop_packet(&mut self, packet: &Packet, at: NodeId, reason: DropReason) {
        trace!(%packet, node = %at, %reason, "dropped at {}", self.now());
        if let Some(monitor) = self.flow_monitor.as_mut() {
            monitor.record_drop(packet, reason);
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            core: Core {
                scheduler: Scheduler::new(),
                network: Network::new(),
                flow_monitor: None,
            },
            sources: Vec::new(),
            sinks: Vec::new(),
            listeners: HashMap::new(),
            samplers: Vec::new(),
            samplers_started: false,
            stop_time: None,
        }
    }

    /// The current simulated time.
    pub fn now(&self) -> SimTime {
        self.core.now()
    }

    pub fn network(&self) -> &Network {
        &self.core.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.core.network
    }

    /// Create a socket on `node`, with an ephemeral port.
    pub fn create_socket(&mut self, node: NodeId) -> Result<Socket, SimError> {
        let node = self.core.network.node_mut(node)?;
        let port = node
            .allocate_ephemeral_port()
            .ok_or(SimError::PortsExhausted(node.id()))?;

        Ok(Socket::new(node.address(port)))
    }

    /// Install a [`PacketSink`] receiving every datagram sent to `address`.
    pub fn install_sink(&mut self, address: Address) -> Result<SinkId, SimError> {
        if !self.core.network.node_mut(address.node)?.reserve_port(address.port) {
            return Err(SimError::AddressInUse(address));
        }

        let id = SinkId::new(self.sinks.len());
        self.sinks.push(PacketSink::new(address));
        self.listeners.insert(address, id);
        debug!(sink = %id, %address, "sink installed");

        Ok(id)
    }

    /// Install a configured [`TrafficSource`]. It does nothing until
    /// started with [`SourceHandle::start_at`].
    pub fn install_source(&mut self, source: TrafficSource) -> Result<SourceHandle<'_>, SimError> {
        let id = SourceId(self.sources.len());
        if source.config().is_none() {
            return Err(SimError::Source {
                id,
                error: SourceError::NotConfigured,
            });
        }
        self.sources.push(source);

        Ok(SourceHandle { sim: self, id })
    }

    /// Install a [`ThroughputSampler`] watching sinks of this simulation.
    pub fn install_sampler(&mut self, sampler: ThroughputSampler) -> Result<SamplerId, SimError> {
        if let Some(unknown) = sampler
            .sinks()
            .iter()
            .find(|sink| sink.index() >= self.sinks.len())
        {
            return Err(SimError::UnknownSink(*unknown));
        }

        let id = SamplerId(self.samplers.len());
        self.samplers.push(sampler);
        Ok(id)
    }

    /// Take the first sample at `time`, and then one every period until
    /// the end of the simulation.
    pub fn start_sampler(&mut self, id: SamplerId, time: SimTime) -> Result<(), SimError> {
        if id.0 >= self.samplers.len() {
            return Err(SimError::UnknownSampler(id));
        }
        self.core.scheduler.schedule_at(time, Event::SamplerTick(id));
        self.samplers_started = true;
        Ok(())
    }

    /// Record per-flow statistics from now on.
    pub fn enable_flow_monitor(&mut self) {
        self.core.flow_monitor.get_or_insert_with(FlowMonitor::new);
    }

    /// Events scheduled after `time` never run.
    pub fn stop_at(&mut self, time: SimTime) {
        self.stop_time = Some(time);
    }

    pub fn stop_time(&self) -> Option<SimTime> {
        self.stop_time
    }

    pub fn flow_monitor(&self) -> Option<&FlowMonitor> {
        self.core.flow_monitor.as_ref()
    }

    pub fn sink(&self, id: SinkId) -> Option<&PacketSink> {
        self.sinks.get(id.index())
    }

    pub fn sinks(&self) -> &[PacketSink] {
        &self.sinks
    }

    pub fn source(&self, id: SourceId) -> Option<&TrafficSource> {
        self.sources.get(id.0)
    }

    pub fn sources(&self) -> &[TrafficSource] {
        &self.sources
    }

    pub fn sampler(&self, id: SamplerId) -> Option<&ThroughputSampler> {
        self.samplers.get(id.0)
    }

    /// Run every event up to the stop time, or until no event is left if
    /// no stop time was set.
    pub fn run(&mut self) -> Result<(), SimError> {
        if self.samplers_started && self.stop_time.is_none() {
            return Err(SimError::Unbounded);
        }
        let limit = self.stop_time.unwrap_or(SimTime::MAX);

        self.core.network.populate_routing_tables();
        debug!(
            sources = self.sources.len(),
            sinks = self.sinks.len(),
            samplers = self.samplers.len(),
            "simulation starts, stop at {limit}"
        );

        let mut events = 0u64;
        while let Some(fired) = self.core.scheduler.pop_until(limit) {
            self.dispatch(fired.event)?;
            events += 1;
        }

        for sampler in self.samplers.iter_mut() {
            sampler.flush()?;
        }
        debug!(events, "simulation finished at {}", self.now());

        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<(), SimError> {
        match event {
            Event::SourceStart(id) => {
                let mut ctx = SourceContext {
                    core: &mut self.core,
                    source: id,
                };
                self.sources[id.0]
                    .start(&mut ctx)
                    .map_err(|error| SimError::Source { id, error })?;
            }
            Event::SourceStop(id) => {
                let mut ctx = SourceContext {
                    core: &mut self.core,
                    source: id,
                };
                let source = &mut self.sources[id.0];
                source.stop(&mut ctx);

                if let Some(socket) = source.socket().filter(|socket| socket.is_closed()) {
                    let local = socket.local();
                    self.core.network.node_mut(local.node)?.release_port(local.port);
                }
            }
            Event::SourceTimer(id) => {
                let mut ctx = SourceContext {
                    core: &mut self.core,
                    source: id,
                };
                self.sources[id.0].on_timer(&mut ctx);
            }
            Event::SamplerTick(id) => {
                let now = self.core.now();
                let sampler = &mut self.samplers[id.0];
                let counters: Vec<&dyn RxCounter> = sampler
                    .sinks()
                    .iter()
                    .map(|sink| &self.sinks[sink.index()] as &dyn RxCounter)
                    .collect();
                sampler.sample(now, &counters)?;

                self.core
                    .scheduler
                    .schedule_after(sampler.period(), Event::SamplerTick(id));
            }
            Event::Arrival { packet, node } => self.arrive(packet, node),
        }
        Ok(())
    }

    fn arrive(&mut self, packet: Packet, node: NodeId) {
        let destination = packet.destination();
        if node != destination.node {
            self.core.forward(packet, node);
            return;
        }

        let now = self.core.now();
        let Some(sink) = self.listeners.get(&destination) else {
            self.core.drop_packet(&packet, node, DropReason::NoListener);
            return;
        };
        self.sinks[sink.index()].receive(&packet, now);
        if let Some(monitor) = self.core.flow_monitor.as_mut() {
            monitor.record_rx(&packet, now);
        }
        trace!(%packet, "received at {now}");
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

impl fmt::Display for SamplerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sampler#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::ThroughputUnit,
        measure::{Bandwidth, Latency, PacketLoss},
    };
    use std::time::Duration;

    const SINK_PORT: u16 = 8080;

    /// Two nodes over a single link.
    fn pair(bandwidth: Bandwidth, latency: Latency) -> (Simulation, NodeId, NodeId) {
        let mut sim = Simulation::new();
        let network = sim.network_mut();
        let a = network.add_node();
        let b = network.add_node();
        network
            .configure_link(a, b)
            .set_bandwidth(bandwidth)
            .set_latency(latency)
            .apply()
            .unwrap();
        (sim, a, b)
    }

    fn source(
        sim: &mut Simulation,
        from: NodeId,
        to: Address,
        budget: u64,
        rate: Bandwidth,
    ) -> TrafficSource {
        let socket = sim.create_socket(from).unwrap();
        let mut source = TrafficSource::new();
        source.configure(socket, to, 1_040, budget, rate).unwrap();
        source
    }

    #[test]
    fn budget_delivered_end_to_end() {
        let (mut sim, a, b) = pair(Bandwidth::new(1_000_000), Latency::from_millis(10));
        sim.enable_flow_monitor();
        let to = Address::new(b, SINK_PORT);
        let sink = sim.install_sink(to).unwrap();
        let source = source(&mut sim, a, to, 10, Bandwidth::new(1_000_000));
        let id = sim
            .install_source(source)
            .unwrap()
            .start_at(SimTime::from_secs(1))
            .id();

        sim.stop_at(SimTime::from_secs(5));
        sim.run().unwrap();

        let sink = sim.sink(sink).unwrap();
        assert_eq!(sink.received_packets(), 10);
        assert_eq!(sink.total_received_bytes(), 10_400);
        // 8.32ms on the wire, 10ms propagation
        assert_eq!(sink.first_rx(), Some(SimTime::from_micros(1_018_320)));
        assert_eq!(sim.source(id).unwrap().packets_sent(), 10);

        let monitor = sim.flow_monitor().unwrap();
        let (_, _, stats) = monitor.flows().next().unwrap();
        assert_eq!(stats.tx_packets, 10);
        assert_eq!(stats.rx_packets, 10);
        assert_eq!(stats.lost_packets, 0);
        assert_eq!(stats.mean_delay(), Some(Duration::from_micros(18_320)));
    }

    #[test]
    fn stopped_source_sends_no_more() {
        let (mut sim, a, b) = pair(Bandwidth::new(100_000_000), Latency::ZERO);
        let to = Address::new(b, SINK_PORT);
        sim.install_sink(to).unwrap();
        let source = source(&mut sim, a, to, 0, Bandwidth::new(1_000_000));
        let id = sim
            .install_source(source)
            .unwrap()
            .start_at(SimTime::from_secs(1))
            .stop_at(SimTime::from_millis(1_020))
            .id();

        sim.stop_at(SimTime::from_secs(2));
        sim.run().unwrap();

        // 1.0, 1.00832, 1.01664; the next one would be at 1.02496
        let source = sim.source(id).unwrap();
        assert_eq!(source.packets_sent(), 3);
        assert!(!source.is_running());
        assert!(source.socket().unwrap().is_closed());
    }

    #[test]
    fn sampler_fires_every_period_until_stop() {
        let (mut sim, a, b) = pair(Bandwidth::new(1_000_000), Latency::from_millis(30));
        let to = Address::new(b, SINK_PORT);
        let sink = sim.install_sink(to).unwrap();
        let source = source(&mut sim, a, to, 0, Bandwidth::new(500_000));
        sim.install_source(source)
            .unwrap()
            .start_at(SimTime::from_secs(1));

        let mut sampler = ThroughputSampler::without_streams(
            vec![sink],
            Duration::from_millis(500),
            ThroughputUnit::Mbps,
        )
        .unwrap();
        sampler.quiet();
        let sampler = sim.install_sampler(sampler).unwrap();
        sim.start_sampler(sampler, SimTime::from_millis(1_100)).unwrap();

        sim.stop_at(SimTime::from_secs(20));
        sim.run().unwrap();

        let sampler = sim.sampler(sampler).unwrap();
        // 1.1, 1.6, ..., 19.6
        assert_eq!(sampler.invocations(), 38);
        assert_eq!(sampler.last_samples()[0].time, SimTime::from_millis(19_600));
        // a steady 0.5Mbit/s flow, 0.25Mbit per period
        let last = sampler.last_samples()[0];
        assert!((last.value - 0.25).abs() < 0.01);
        assert!((last.rate - 0.5).abs() < 0.02);
    }

    #[test]
    fn sampler_needs_stop_time() {
        let mut sim = Simulation::new();
        let n = sim.network_mut().add_node();
        let sink = sim.install_sink(Address::new(n, SINK_PORT)).unwrap();
        let sampler =
            ThroughputSampler::without_streams(vec![sink], Duration::from_secs(1), ThroughputUnit::Kbps)
                .unwrap();
        let sampler = sim.install_sampler(sampler).unwrap();
        sim.start_sampler(sampler, SimTime::ZERO).unwrap();

        assert!(matches!(sim.run(), Err(SimError::Unbounded)));
    }

    #[test]
    fn sampler_on_unknown_sink() {
        let mut sim = Simulation::new();
        let sampler = ThroughputSampler::without_streams(
            vec![SinkId::new(0)],
            Duration::from_secs(1),
            ThroughputUnit::Kbps,
        )
        .unwrap();

        assert!(matches!(
            sim.install_sampler(sampler),
            Err(SimError::UnknownSink(_))
        ));
    }

    #[test]
    fn no_listener_drops() {
        let (mut sim, a, b) = pair(Bandwidth::new(1_000_000), Latency::ZERO);
        sim.enable_flow_monitor();
        let source = source(&mut sim, a, Address::new(b, 9), 4, Bandwidth::new(1_000_000));
        sim.install_source(source)
            .unwrap()
            .start_at(SimTime::ZERO);
        sim.run().unwrap();

        let (_, _, stats) = sim.flow_monitor().unwrap().flows().next().unwrap();
        assert_eq!(stats.tx_packets, 4);
        assert_eq!(stats.rx_packets, 0);
        assert_eq!(stats.lost_packets, 4);
    }

    #[test]
    fn bottleneck_drops_excess() {
        let (mut sim, a, b) = pair(Bandwidth::new(1_000_000), Latency::from_millis(5));
        sim.network_mut()
            .configure_link(a, b)
            .set_bandwidth(Bandwidth::new(1_000_000))
            .set_queue_limit(5)
            .apply()
            .unwrap();
        sim.enable_flow_monitor();
        let to = Address::new(b, SINK_PORT);
        sim.install_sink(to).unwrap();
        let source = source(&mut sim, a, to, 100, Bandwidth::new(10_000_000));
        sim.install_source(source)
            .unwrap()
            .start_at(SimTime::ZERO);
        sim.run().unwrap();

        let (_, _, stats) = sim.flow_monitor().unwrap().flows().next().unwrap();
        assert_eq!(stats.tx_packets, 100);
        assert!(stats.lost_packets > 0);
        assert_eq!(stats.rx_packets + stats.lost_packets, 100);
    }

    #[test]
    fn loss_is_reproducible() {
        let run = |seed| {
            let (mut sim, a, b) = pair(Bandwidth::new(1_000_000), Latency::ZERO);
            sim.network_mut().set_seed(seed);
            sim.network_mut()
                .configure_link(a, b)
                .set_packet_loss(PacketLoss::new(0.2).unwrap())
                .apply()
                .unwrap();
            let to = Address::new(b, SINK_PORT);
            let sink = sim.install_sink(to).unwrap();
            let source = source(&mut sim, a, to, 200, Bandwidth::new(1_000_000));
            sim.install_source(source)
                .unwrap()
                .start_at(SimTime::ZERO);
            sim.run().unwrap();
            sim.sink(sink).unwrap().received_packets()
        };

        let received = run(7);
        assert_eq!(received, run(7));
        assert!(received > 120 && received < 190, "received {received}/200");
    }

    #[test]
    fn address_in_use() {
        let mut sim = Simulation::new();
        let n = sim.network_mut().add_node();
        let address = Address::new(n, SINK_PORT);
        sim.install_sink(address).unwrap();

        assert!(matches!(
            sim.install_sink(address),
            Err(SimError::AddressInUse(a)) if a == address
        ));
    }

    #[test]
    fn local_delivery() {
        let mut sim = Simulation::new();
        let n = sim.network_mut().add_node();
        let to = Address::new(n, SINK_PORT);
        let sink = sim.install_sink(to).unwrap();
        let source = source(&mut sim, n, to, 3, Bandwidth::new(1_000_000));
        sim.install_source(source)
            .unwrap()
            .start_at(SimTime::ZERO);
        sim.run().unwrap();

        assert_eq!(sim.sink(sink).unwrap().received_packets(), 3);
    }

    #[test]
    fn unconfigured_source_is_refused() {
        let mut sim = Simulation::new();
        assert!(matches!(
            sim.install_source(TrafficSource::new()),
            Err(SimError::Source {
                error: SourceError::NotConfigured,
                ..
            })
        ));
    }
}
