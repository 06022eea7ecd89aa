//! The discrete-event scheduler.
//!
//! Events are kept in a binary heap ordered by their fire time and, for
//! events scheduled at the same instant, by the order in which they were
//! scheduled. Every scheduled event receives an [`EventId`] made of an arena
//! slot and a generation counter. Cancelling an event only bumps the slot's
//! generation: the heap entry is left in place and silently discarded when
//! it reaches the top of the queue.

use crate::time::SimTime;
use core::cmp::Reverse;
use std::{collections::BinaryHeap, fmt, time::Duration};

/// Handle of a scheduled event, used to cancel it.
///
/// An [`EventId`] stays valid until the event fires or is cancelled. After
/// that the handle is stale: [`Scheduler::is_pending`] returns `false` and
/// [`Scheduler::cancel`] is a no-op, even if the underlying slot has been
/// reused by a newer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    slot: u32,
    generation: u32,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.slot, self.generation)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    generation: u32,
    armed: bool,
}

struct Entry<E> {
    time: SimTime,
    sequence: u64,
    id: EventId,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// An event taken out of the [`Scheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<E> {
    pub id: EventId,
    pub time: SimTime,
    pub event: E,
}

/// Priority queue of future events on the simulated clock.
///
/// ```
/// # use flowsim_core::{scheduler::Scheduler, time::SimTime};
/// # use std::time::Duration;
/// let mut scheduler = Scheduler::new();
///
/// let a = scheduler.schedule_after(Duration::from_millis(10), "a");
/// let _b = scheduler.schedule_after(Duration::from_millis(5), "b");
/// scheduler.cancel(a);
///
/// let fired = scheduler.pop().unwrap();
/// assert_eq!(fired.event, "b");
/// assert_eq!(scheduler.now(), SimTime::from_millis(5));
/// assert!(scheduler.pop().is_none());
/// ```
pub struct Scheduler<E> {
    now: SimTime,
    queue: BinaryHeap<Reverse<Entry<E>>>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    sequence: u64,
    pending: usize,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            queue: BinaryHeap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            sequence: 0,
            pending: 0,
        }
    }

    /// The current simulated time: the fire time of the last popped event.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of events still pending (cancelled events are not counted).
    #[inline]
    pub fn len(&self) -> usize {
        self.pending
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Schedule `event` to fire at `time`.
    ///
    /// Scheduling in the past is clamped to [`Scheduler::now`]: the event
    /// fires after every event already scheduled for the current instant.
    pub fn schedule_at(&mut self, time: SimTime, event: E) -> EventId {
        let time = time.max(self.now);
        let id = self.allocate();
        let sequence = self.sequence;
        self.sequence += 1;
        self.pending += 1;

        self.queue.push(Reverse(Entry {
            time,
            sequence,
            id,
            event,
        }));
        id
    }

    /// Schedule `event` to fire `delay` after [`Scheduler::now`].
    pub fn schedule_after(&mut self, delay: Duration, event: E) -> EventId {
        let time = self.now + delay;
        self.schedule_at(time, event)
    }

    /// Schedule `event` to fire at the current instant.
    pub fn schedule_now(&mut self, event: E) -> EventId {
        self.schedule_at(self.now, event)
    }

    /// Returns `true` if the event has neither fired nor been cancelled.
    pub fn is_pending(&self, id: EventId) -> bool {
        self.slots
            .get(id.slot as usize)
            .is_some_and(|slot| slot.armed && slot.generation == id.generation)
    }

    /// Cancel a pending event.
    ///
    /// Returns `false` if the event already fired or was already cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if !self.is_pending(id) {
            return false;
        }
        self.release(id);
        true
    }

    /// Fire time of the next pending event.
    pub fn next_time(&mut self) -> Option<SimTime> {
        self.discard_stale();
        self.queue.peek().map(|Reverse(entry)| entry.time)
    }

    /// Take the next pending event and advance the clock to its fire time.
    pub fn pop(&mut self) -> Option<Fired<E>> {
        self.pop_until(SimTime::MAX)
    }

    /// Take the next pending event if it fires at or before `limit`.
    ///
    /// Events beyond `limit` stay in the queue and the clock is left
    /// untouched.
    pub fn pop_until(&mut self, limit: SimTime) -> Option<Fired<E>> {
        self.discard_stale();

        let due = self
            .queue
            .peek()
            .is_some_and(|Reverse(entry)| entry.time <= limit);
        if !due {
            return None;
        }

        let Reverse(entry) = self.queue.pop()?;
        self.release(entry.id);
        self.now = entry.time;

        Some(Fired {
            id: entry.id,
            time: entry.time,
            event: entry.event,
        })
    }

    fn discard_stale(&mut self) {
        while let Some(Reverse(entry)) = self.queue.peek() {
            if self.is_pending(entry.id) {
                break;
            }
            self.queue.pop();
        }
    }

    fn allocate(&mut self) -> EventId {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.armed = true;

        EventId {
            slot,
            generation: entry.generation,
        }
    }

    fn release(&mut self, id: EventId) {
        let slot = &mut self.slots[id.slot as usize];
        slot.armed = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot);
        self.pending -= 1;
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn empty() {
        let mut s = Scheduler::<()>::new();

        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert!(s.pop().is_none());
        assert!(s.next_time().is_none());
        assert_eq!(s.now(), SimTime::ZERO);
    }

    #[test]
    fn fires_in_time_order() {
        let mut s = Scheduler::new();
        s.schedule_after(3 * MS, 3);
        s.schedule_after(MS, 1);
        s.schedule_after(2 * MS, 2);

        let order: Vec<_> = std::iter::from_fn(|| s.pop().map(|f| f.event)).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(s.now(), SimTime::from_millis(3));
    }

    #[test]
    fn simultaneous_events_are_fifo() {
        let mut s = Scheduler::new();
        for i in 0..10 {
            s.schedule_at(SimTime::from_secs(1), i);
        }
        let order: Vec<_> = std::iter::from_fn(|| s.pop().map(|f| f.event)).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn cancel_skips_event() {
        let mut s = Scheduler::new();
        let a = s.schedule_after(MS, "a");
        let b = s.schedule_after(2 * MS, "b");

        assert!(s.cancel(a));
        assert!(!s.cancel(a), "second cancel is a no-op");
        assert!(!s.is_pending(a));
        assert!(s.is_pending(b));
        assert_eq!(s.len(), 1);

        assert_eq!(s.next_time(), Some(SimTime::from_millis(2)));
        assert_eq!(s.pop().map(|f| f.event), Some("b"));
        assert!(s.pop().is_none());
    }

    #[test]
    fn stale_handle_does_not_cancel_reused_slot() {
        let mut s = Scheduler::new();
        let a = s.schedule_after(MS, "a");
        s.cancel(a);

        // reuses the slot of `a` with a new generation
        let b = s.schedule_after(MS, "b");
        assert_ne!(a, b);
        assert!(!s.cancel(a));
        assert!(s.is_pending(b));
        assert_eq!(s.pop().map(|f| f.event), Some("b"));
    }

    #[test]
    fn fired_event_is_no_longer_pending() {
        let mut s = Scheduler::new();
        let a = s.schedule_now(());
        let fired = s.pop().unwrap();
        assert_eq!(fired.id, a);
        assert!(!s.is_pending(a));
        assert!(!s.cancel(a));
    }

    #[test]
    fn pop_until_leaves_later_events() {
        let mut s = Scheduler::new();
        s.schedule_at(SimTime::from_secs(1), 1);
        s.schedule_at(SimTime::from_secs(2), 2);

        assert_eq!(
            s.pop_until(SimTime::from_secs(1)).map(|f| f.event),
            Some(1)
        );
        assert!(s.pop_until(SimTime::from_millis(1_999)).is_none());
        assert_eq!(s.now(), SimTime::from_secs(1));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn past_is_clamped_to_now() {
        let mut s = Scheduler::new();
        s.schedule_at(SimTime::from_secs(5), "later");
        s.pop();

        s.schedule_at(SimTime::from_secs(1), "past");
        let fired = s.pop().unwrap();
        assert_eq!(fired.time, SimTime::from_secs(5));
        assert_eq!(s.now(), SimTime::from_secs(5));
    }
}
