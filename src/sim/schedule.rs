use std::rc::Rc;
use std::time::Duration;

use crate::devices::load::DeviceLoad;
use crate::devices::types::Shared;

use super::clock::Simulator;
use super::event::EventId;

/// Piecewise-constant current profile for a [`DeviceLoad`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentSchedule {
    /// `(time, current_a)` steps, kept sorted by time.
    steps: Vec<(Duration, f64)>,
}

impl CurrentSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle current everywhere except `[start, end)`, where `active_a` flows.
    pub fn active_window(idle_a: f64, active_a: f64, start: Duration, end: Duration) -> Self {
        Self::new()
            .with_step(Duration::ZERO, idle_a)
            .with_step(start, active_a)
            .with_step(end, idle_a)
    }

    /// Adds a step switching to `current_a` at `at`.
    ///
    /// Steps sharing a timestamp apply in insertion order, so the last one wins.
    pub fn with_step(mut self, at: Duration, current_a: f64) -> Self {
        let idx = self.steps.partition_point(|(t, _)| *t <= at);
        self.steps.insert(idx, (at, current_a));
        self
    }

    pub fn steps(&self) -> &[(Duration, f64)] {
        &self.steps
    }

    /// Current in force at `at` (0.0 before the first step).
    pub fn current_at(&self, at: Duration) -> f64 {
        let idx = self.steps.partition_point(|(t, _)| *t <= at);
        if idx == 0 { 0.0 } else { self.steps[idx - 1].1 }
    }

    /// Registers one simulator event per step against `load`.
    pub fn install(&self, load: &Shared<DeviceLoad>, sim: &mut Simulator) -> Vec<EventId> {
        self.steps
            .iter()
            .map(|&(at, current_a)| {
                let weak = Rc::downgrade(load);
                sim.schedule_at(at, move |sim| {
                    if let Some(load) = weak.upgrade() {
                        load.borrow_mut().set_current_a(sim.now(), current_a);
                    }
                })
            })
            .collect()
    }
}
