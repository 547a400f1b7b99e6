use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::devices::types::{EnergySource, Shared};
use crate::sim::clock::Simulator;
use crate::sim::event::EventId;

/// A consumer device drawing a constant current from an energy source.
///
/// Every `update_interval` the load settles the energy used since the last
/// update, `V * I * dt`, where `V` is the source's supply voltage at the time
/// of settlement. Changing the current settles first, so each interval is
/// charged at the current that was actually flowing.
///
/// The source may be a plain battery or a harvesting composite; the load only
/// sees the [`EnergySource`] capability.
pub struct DeviceLoad {
    /// Human-readable device name.
    pub name: String,

    source: Shared<dyn EnergySource>,

    /// Present current draw in amperes.
    current_a: f64,

    /// Spacing of periodic settlements.
    update_interval: Duration,

    last_update: Duration,
    consumed_j: f64,
    update_event: Option<EventId>,
}

impl DeviceLoad {
    /// Creates an idle load attached to `source`.
    ///
    /// # Panics
    ///
    /// Panics if `update_interval` is zero.
    pub fn new(
        name: impl Into<String>,
        source: Shared<dyn EnergySource>,
        update_interval: Duration,
    ) -> Self {
        assert!(!update_interval.is_zero(), "update_interval must be > 0");
        Self {
            name: name.into(),
            source,
            current_a: 0.0,
            update_interval,
            last_update: Duration::ZERO,
            consumed_j: 0.0,
            update_event: None,
        }
    }

    /// Present current draw in amperes.
    pub fn current_a(&self) -> f64 {
        self.current_a
    }

    /// Energy delivered to this load so far (J).
    pub fn consumed_j(&self) -> f64 {
        self.consumed_j
    }

    /// The source this load draws from.
    pub fn source(&self) -> &Shared<dyn EnergySource> {
        &self.source
    }

    /// Starts periodic settlement from the current simulation time.
    pub fn start(load: &Shared<Self>, sim: &mut Simulator) {
        load.borrow_mut().last_update = sim.now();
        Self::schedule_update(load, sim);
    }

    fn schedule_update(load: &Shared<Self>, sim: &mut Simulator) {
        let weak = Rc::downgrade(load);
        let interval = load.borrow().update_interval;
        let event = sim.schedule_after(interval, move |sim| {
            if let Some(load) = weak.upgrade() {
                load.borrow_mut().settle(sim.now());
                Self::schedule_update(&load, sim);
            }
        });
        load.borrow_mut().update_event = Some(event);
    }

    /// Switches the current draw at `now`, settling the elapsed interval at
    /// the previous current. Negative values are treated as zero.
    pub fn set_current_a(&mut self, now: Duration, current_a: f64) {
        self.settle(now);
        self.current_a = current_a.max(0.0);
        self.source.borrow_mut().set_load_current_a(self.current_a);
        debug!(
            device = %self.name,
            t_s = now.as_secs_f64(),
            current_a = self.current_a,
            "load current changed"
        );
    }

    /// Draws the energy used since the last settlement.
    fn settle(&mut self, now: Duration) {
        let dt = now.saturating_sub(self.last_update).as_secs_f64();
        self.last_update = now;
        if dt <= 0.0 || self.current_a <= 0.0 {
            return;
        }

        let mut source = self.source.borrow_mut();
        let demand_j = source.supply_voltage_v() * self.current_a * dt;
        if demand_j > 0.0 {
            self.consumed_j += source.draw_energy_j(demand_j);
        }
    }

    /// Cancels the pending settlement event.
    pub fn stop(&mut self) {
        if let Some(event) = self.update_event.take() {
            event.cancel();
        }
    }
}

impl Drop for DeviceLoad {
    fn drop(&mut self) {
        self.stop();
    }
}
