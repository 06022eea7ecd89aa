use super::{Core, Event, SourceId};
use crate::{
    app::{AppContext, Datagram},
    scheduler::EventId,
    time::SimTime,
};
use std::time::Duration;

/// The view of the simulation a [`TrafficSource`] gets while one of its
/// callbacks runs.
///
/// [`TrafficSource`]: crate::app::TrafficSource
pub(super) struct SourceContext<'a> {
    pub(super) core: &'a mut Core,
    pub(super) source: SourceId,
}

impl AppContext for SourceContext<'_> {
    fn now(&self) -> SimTime {
        self.core.scheduler.now()
    }

    fn schedule_after(&mut self, delay: Duration) -> EventId {
        self.core
            .scheduler
            .schedule_after(delay, Event::SourceTimer(self.source))
    }

    fn cancel(&mut self, event: EventId) -> bool {
        self.core.scheduler.cancel(event)
    }

    fn send(&mut self, datagram: Datagram) {
        self.core.send(datagram);
    }
}
