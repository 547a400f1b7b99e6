//! Energy simulation of battery-powered and solar-harvesting nodes.
//!
//! The core is [`energy::composite::CompositeEnergySource`]: a battery
//! façade that injects harvested energy on a discrete-event clock, either
//! from a fixed power window or from an orbital illumination/eclipse cycle.

pub mod cli;
pub mod config;
pub mod devices;
pub mod energy;
pub mod error;
pub mod io;
/// Discrete-event clock, fleet engine, and reporting.
pub mod sim;
pub mod telemetry;
