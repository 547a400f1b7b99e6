//! Energy harvesting: policies, the illumination state machine, and the
//! composite battery + harvester source.

/// Battery-wrapping source that schedules harvest ticks.
pub mod composite;
/// Harvest policies and their configuration.
pub mod harvest;
pub mod illumination;

pub use composite::CompositeEnergySource;
pub use harvest::{FixedWindow, HarvestConfig, HarvestPolicy, IlluminationCycle, SolarPanel};
pub use illumination::{IlluminationState, Phase};
