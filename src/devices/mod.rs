//! Energy reservoirs and the consumers that draw from them.

/// Lithium-ion battery reservoir model.
pub mod battery;
/// Constant-current consumer device.
pub mod load;
pub mod types;

// Re-export the main types for convenience
pub use battery::LiIonBattery;
pub use load::DeviceLoad;
pub use types::EnergySource;
pub use types::{Shared, shared};
