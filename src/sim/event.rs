//! Handles to scheduled simulator callbacks.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug)]
struct EventState {
    time: Duration,
    cancelled: Cell<bool>,
    fired: Cell<bool>,
}

/// Cancellable handle to a callback registered with the
/// [`Simulator`](super::clock::Simulator).
///
/// Clones share state: cancelling any clone cancels the event. An event is
/// *running* from the moment it is scheduled until it either fires or is
/// cancelled.
#[derive(Clone)]
pub struct EventId {
    uid: u64,
    state: Rc<EventState>,
}

impl EventId {
    pub(crate) fn new(uid: u64, time: Duration) -> Self {
        Self {
            uid,
            state: Rc::new(EventState {
                time,
                cancelled: Cell::new(false),
                fired: Cell::new(false),
            }),
        }
    }

    /// Unique, monotonically increasing identifier (scheduling order).
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Absolute simulation time the event is due at.
    pub fn time(&self) -> Duration {
        self.state.time
    }

    /// Prevents the callback from firing. No effect once it has fired.
    pub fn cancel(&self) {
        if !self.state.fired.get() {
            self.state.cancelled.set(true);
        }
    }

    /// Returns `true` if the event was cancelled before firing.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Returns `true` once the event has fired or been cancelled.
    pub fn is_expired(&self) -> bool {
        self.state.fired.get() || self.state.cancelled.get()
    }

    /// Returns `true` while the event is still pending.
    pub fn is_running(&self) -> bool {
        !self.is_expired()
    }

    pub(crate) fn mark_fired(&self) {
        self.state.fired.set(true);
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for EventId {}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventId")
            .field("uid", &self.uid)
            .field("time", &self.state.time)
            .field("running", &self.is_running())
            .finish()
    }
}
