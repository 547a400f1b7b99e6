use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::time::Duration;

use tracing::trace;

use super::event::EventId;

type Callback = Box<dyn FnOnce(&mut Simulator)>;

struct Scheduled {
    event: EventId,
    callback: Callback,
}

impl Scheduled {
    fn key(&self) -> (Duration, u64) {
        (self.event.time(), self.event.uid())
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap pops the earliest (time, uid) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// A discrete-event simulation clock.
///
/// Callbacks are executed strictly in timestamp order; callbacks sharing a
/// timestamp fire in the order they were scheduled. Time only advances when
/// an event is dispatched, so "waiting" is expressed by scheduling a future
/// callback and returning.
///
/// # Examples
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use harvest_sim::sim::clock::Simulator;
///
/// let mut sim = Simulator::new();
/// let fired = Rc::new(RefCell::new(Vec::new()));
///
/// let log = Rc::clone(&fired);
/// sim.schedule_after(Duration::from_secs(2), move |sim| log.borrow_mut().push(sim.now()));
/// let log = Rc::clone(&fired);
/// sim.schedule_after(Duration::from_secs(1), move |sim| log.borrow_mut().push(sim.now()));
///
/// sim.run_until(Duration::from_secs(10));
/// assert_eq!(*fired.borrow(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
/// assert_eq!(sim.now(), Duration::from_secs(10));
/// ```
pub struct Simulator {
    /// Current simulation time.
    now: Duration,
    /// Identifier handed to the next scheduled event.
    next_uid: u64,
    queue: BinaryHeap<Scheduled>,
    stopped: bool,
    executed: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Creates a simulator positioned at time zero with an empty queue.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_uid: 0,
            queue: BinaryHeap::new(),
            stopped: false,
            executed: 0,
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedules `callback` at the absolute time `at`.
    ///
    /// A time already in the past is treated as "now": the callback fires
    /// after every event already queued for the current instant.
    pub fn schedule_at(
        &mut self,
        at: Duration,
        callback: impl FnOnce(&mut Simulator) + 'static,
    ) -> EventId {
        let at = at.max(self.now);
        let event = EventId::new(self.next_uid, at);
        self.next_uid += 1;
        self.queue.push(Scheduled {
            event: event.clone(),
            callback: Box::new(callback),
        });
        event
    }

    /// Schedules `callback` to fire `delay` after the current time.
    pub fn schedule_after(
        &mut self,
        delay: Duration,
        callback: impl FnOnce(&mut Simulator) + 'static,
    ) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule_at(at, callback)
    }

    /// Schedules `callback` at the current time.
    pub fn schedule_now(&mut self, callback: impl FnOnce(&mut Simulator) + 'static) -> EventId {
        self.schedule_at(self.now, callback)
    }

    /// Cancels a pending event. Cancelling an expired event is a no-op.
    pub fn cancel(&mut self, event: &EventId) {
        event.cancel();
    }

    /// Returns `true` if `event` has neither fired nor been cancelled.
    pub fn is_running(&self, event: &EventId) -> bool {
        event.is_running()
    }

    /// Requests the current `run`/`run_until` call to return after the
    /// callback in progress completes.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Number of queued events that have not been cancelled.
    pub fn pending_events(&self) -> usize {
        self.queue.iter().filter(|s| s.event.is_running()).count()
    }

    /// Number of callbacks dispatched so far.
    pub fn executed_events(&self) -> u64 {
        self.executed
    }

    /// Dispatches every event due strictly before `horizon`, then moves the
    /// clock to `horizon`.
    ///
    /// Events scheduled exactly at `horizon` stay queued, so consecutive calls
    /// with increasing horizons behave like one uninterrupted run.
    pub fn run_until(&mut self, horizon: Duration) {
        self.stopped = false;
        loop {
            if self.stopped {
                break;
            }
            match self.queue.peek() {
                Some(next) if next.event.time() < horizon => {}
                _ => break,
            }
            let Some(scheduled) = self.queue.pop() else {
                break;
            };
            self.dispatch(scheduled);
        }
        if !self.stopped {
            self.now = self.now.max(horizon);
        }
        trace!(now = ?self.now, pending = self.queue.len(), "simulation paused");
    }

    /// Dispatches events until the queue is empty or [`stop`](Self::stop)
    /// is called. Never returns while a self-rescheduling loop is active.
    pub fn run(&mut self) {
        self.stopped = false;
        while !self.stopped {
            let Some(scheduled) = self.queue.pop() else {
                break;
            };
            self.dispatch(scheduled);
        }
    }

    fn dispatch(&mut self, scheduled: Scheduled) {
        let Scheduled { event, callback } = scheduled;
        if event.is_cancelled() {
            return;
        }
        self.now = event.time();
        event.mark_fired();
        self.executed += 1;
        callback(self);
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("now", &self.now)
            .field("queued", &self.queue.len())
            .field("executed", &self.executed)
            .finish()
    }
}
