//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use harvest_sim::config::BatteryConfig;
use harvest_sim::devices::{LiIonBattery, Shared, shared};
use harvest_sim::energy::{CompositeEnergySource, HarvestConfig, SolarPanel};
use harvest_sim::sim::clock::Simulator;

pub type Composite = CompositeEnergySource<LiIonBattery>;

/// Battery with the default cell curve and no internal resistance.
pub fn battery(initial_energy_j: f64, capacity_j: f64) -> Shared<LiIonBattery> {
    shared(
        LiIonBattery::new(&BatteryConfig {
            initial_energy_j,
            capacity_j,
            internal_resistance_ohm: 0.0,
            ..BatteryConfig::default()
        })
        .expect("fixture battery should be valid"),
    )
}

/// Composite source bound to `battery`, configured but not started.
pub fn composite(battery: &Shared<LiIonBattery>, config: HarvestConfig) -> Shared<Composite> {
    let mut source = CompositeEnergySource::with_config(config).expect("valid harvest config");
    source
        .attach_battery(battery.clone())
        .expect("first attach succeeds");
    shared(source)
}

/// Fixed 500 W window over `[0, 10)` s with 1 s ticks.
pub fn ten_second_window() -> HarvestConfig {
    HarvestConfig::fixed_window(500.0, 0.0, 10.0, 1.0)
}

/// 1 m² panel at 25 % efficiency, lit for 10 s then eclipsed for 5 s.
pub fn short_orbit() -> HarvestConfig {
    HarvestConfig::illumination_cycle(
        SolarPanel {
            area_m2: 1.0,
            efficiency: 0.25,
            solar_constant_w_m2: 1361.0,
        },
        10.0,
        5.0,
        1.0,
    )
}

/// Starts `source` on a fresh clock and runs it to `horizon_s`.
pub fn run_for(source: &Shared<Composite>, horizon_s: u64) -> Simulator {
    let mut sim = Simulator::new();
    CompositeEnergySource::start(source, &mut sim).expect("start succeeds");
    sim.run_until(Duration::from_secs(horizon_s));
    sim
}
