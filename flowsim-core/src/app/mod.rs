//! Applications running on the simulated nodes.
//!
//! * [`TrafficSource`] sends fixed-size datagrams at a constant rate until
//!   a packet budget is exhausted.
//! * [`PacketSink`] receives datagrams and counts the bytes.
//! * [`ThroughputSampler`] periodically turns the sinks' counters into
//!   throughput samples.

mod sampler;
mod sink;
mod socket;
mod source;

use crate::{scheduler::EventId, time::SimTime};
use std::{fmt, time::Duration};

pub use self::{
    sampler::{Sample, SamplerError, ThroughputSampler, ThroughputUnit},
    sink::{PacketSink, RxCounter},
    socket::{Datagram, Socket, SocketError},
    source::{SourceConfig, SourceError, TrafficSource},
};

/// What an application may ask of the simulation hosting it.
///
/// Timers scheduled through the context come back to the application
/// that scheduled them as a call to its `on_timer` method.
pub trait AppContext {
    /// The current simulated time.
    fn now(&self) -> SimTime;

    /// Fire the application's timer `delay` from now.
    fn schedule_after(&mut self, delay: Duration) -> EventId;

    /// Cancel a timer. Returns `false` if it already fired.
    fn cancel(&mut self, event: EventId) -> bool;

    /// Hand a datagram to the network at the current time.
    fn send(&mut self, datagram: Datagram);
}

/// Identifier of a [`PacketSink`] installed in a [`Simulation`].
///
/// [`Simulation`]: crate::sim::Simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SinkId(usize);

impl SinkId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use std::{cell::RefCell, io, rc::Rc};

    /// Records what an application does, with a real scheduler behind it
    /// for the timers.
    pub(crate) struct MockContext {
        timers: Scheduler<()>,
        pub sent: Vec<(SimTime, Datagram)>,
    }

    impl MockContext {
        pub fn new() -> Self {
            Self {
                timers: Scheduler::new(),
                sent: Vec::new(),
            }
        }

        pub fn set_now(&mut self, time: SimTime) {
            self.timers.schedule_at(time, ());
            self.timers.pop();
        }

        /// Fire the next timer due at or before `until`.
        pub fn advance(&mut self, until: SimTime) -> Option<SimTime> {
            self.timers.pop_until(until).map(|fired| fired.time)
        }

        pub fn pending(&self) -> usize {
            self.timers.len()
        }

        pub fn is_idle(&self) -> bool {
            self.timers.is_empty()
        }
    }

    impl AppContext for MockContext {
        fn now(&self) -> SimTime {
            self.timers.now()
        }

        fn schedule_after(&mut self, delay: Duration) -> EventId {
            self.timers.schedule_after(delay, ())
        }

        fn cancel(&mut self, event: EventId) -> bool {
            self.timers.cancel(event)
        }

        fn send(&mut self, datagram: Datagram) {
            self.sent.push((self.now(), datagram));
        }
    }

    /// An in-memory writer that can be inspected after being handed over.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_id_display() {
        assert_eq!(SinkId::new(3).to_string(), "sink#3");
    }
}
