//! The energy-source capability shared by batteries and harvesting sources.

use std::cell::RefCell;
use std::rc::Rc;

/// Single-threaded shared handle used for simulation objects that scheduled
/// callbacks need to reach.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps `value` in a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Trait defining anything a consumer device can draw energy from.
///
/// Plain batteries and harvesting composites both implement it, so a
/// consumer cannot tell the two apart.
pub trait EnergySource {
    /// Energy currently stored, in joules.
    fn remaining_energy_j(&self) -> f64;

    /// Capacity, in joules.
    fn total_energy_j(&self) -> f64;

    /// Terminal voltage under the present load, in volts.
    fn supply_voltage_v(&self) -> f64;

    /// Stores up to `joules`, clamped at capacity.
    ///
    /// # Returns
    ///
    /// The energy actually accepted. Non-positive input is ignored.
    fn add_energy_j(&mut self, joules: f64) -> f64;

    /// Removes up to `joules`.
    ///
    /// # Returns
    ///
    /// The energy actually delivered; never more than what was stored.
    fn draw_energy_j(&mut self, joules: f64) -> f64;

    /// Records the total current consumers are drawing, in amperes.
    fn set_load_current_a(&mut self, current_a: f64);

    /// Returns `true` once the source can no longer sustain its load.
    fn is_depleted(&self) -> bool;

    /// Remaining energy as a fraction of capacity (0.0 when capacity is 0).
    fn state_of_charge(&self) -> f64 {
        let total = self.total_energy_j();
        if total > 0.0 {
            self.remaining_energy_j() / total
        } else {
            0.0
        }
    }
}
