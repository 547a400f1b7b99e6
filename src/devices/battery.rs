use tracing::{info, warn};

use crate::config::BatteryConfig;
use crate::devices::types::EnergySource;
use crate::error::EnergySourceError;

/// State of charge where the flat nominal zone begins.
const NOMINAL_ZONE_SOC: f64 = 0.8;
/// State of charge where the discharge knee begins.
const KNEE_SOC: f64 = 0.2;

/// A lithium-ion cell pack acting as the energy reservoir of a node.
///
/// `LiIonBattery` stores energy in joules, enforces its capacity ceiling, and
/// derives its terminal voltage from state of charge with a piecewise-linear
/// open-circuit curve:
///
/// ```text
///  SoC  1.0 ── initial_cell_voltage
///       0.8 ── nominal_cell_voltage
///       0.2 ── exp_cell_voltage
///       0.0 ── threshold_voltage
/// ```
///
/// minus the internal-resistance drop of the present load current.
#[derive(Debug, Clone)]
pub struct LiIonBattery {
    /// Maximum storable energy in joules.
    pub capacity_j: f64,

    /// Open-circuit voltage of a full pack.
    pub initial_cell_voltage: f64,

    /// Voltage across the long flat part of the discharge curve.
    pub nominal_cell_voltage: f64,

    /// Voltage where the discharge knee starts.
    pub exp_cell_voltage: f64,

    /// Internal series resistance in ohms.
    pub internal_resistance_ohm: f64,

    /// Cut-off voltage below which the pack is considered depleted.
    pub threshold_voltage: f64,

    remaining_j: f64,
    load_current_a: f64,
    depleted: bool,
}

impl LiIonBattery {
    /// Creates a new battery from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EnergySourceError::InvalidConfig`] listing every violated
    /// constraint (see [`BatteryConfig::validate`]).
    pub fn new(config: &BatteryConfig) -> Result<Self, EnergySourceError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(EnergySourceError::InvalidConfig(errors));
        }

        Ok(Self {
            capacity_j: config.capacity_j,
            initial_cell_voltage: config.initial_cell_voltage,
            nominal_cell_voltage: config.nominal_cell_voltage,
            exp_cell_voltage: config.exp_cell_voltage,
            internal_resistance_ohm: config.internal_resistance_ohm,
            threshold_voltage: config.threshold_voltage,
            remaining_j: config.initial_energy_j,
            load_current_a: 0.0,
            depleted: config.initial_energy_j <= 0.0,
        })
    }

    /// Open-circuit voltage at the present state of charge.
    pub fn open_circuit_voltage_v(&self) -> f64 {
        let soc = self.state_of_charge().clamp(0.0, 1.0);
        let curve = [
            (0.0, self.threshold_voltage),
            (KNEE_SOC, self.exp_cell_voltage),
            (NOMINAL_ZONE_SOC, self.nominal_cell_voltage),
            (1.0, self.initial_cell_voltage),
        ];
        for pair in curve.windows(2) {
            let (s0, v0) = pair[0];
            let (s1, v1) = pair[1];
            if soc <= s1 {
                return v0 + (v1 - v0) * (soc - s0) / (s1 - s0);
            }
        }
        self.initial_cell_voltage
    }

    /// Remaining charge in ampere-hours at nominal voltage.
    pub fn remaining_ah(&self) -> f64 {
        self.remaining_j / (3600.0 * self.nominal_cell_voltage)
    }

    /// Current drawn by consumers, in amperes.
    pub fn load_current_a(&self) -> f64 {
        self.load_current_a
    }

    fn update_depletion(&mut self) {
        let exhausted = self.remaining_j <= 0.0
            || (self.load_current_a > 0.0 && self.supply_voltage_v() <= self.threshold_voltage);
        if exhausted && !self.depleted {
            self.depleted = true;
            warn!(
                remaining_j = self.remaining_j,
                voltage_v = self.supply_voltage_v(),
                "battery depleted"
            );
        } else if !exhausted && self.depleted {
            self.depleted = false;
            info!(remaining_j = self.remaining_j, "battery recovered");
        }
    }
}

impl EnergySource for LiIonBattery {
    fn remaining_energy_j(&self) -> f64 {
        self.remaining_j
    }

    fn total_energy_j(&self) -> f64 {
        self.capacity_j
    }

    fn supply_voltage_v(&self) -> f64 {
        (self.open_circuit_voltage_v() - self.internal_resistance_ohm * self.load_current_a)
            .max(0.0)
    }

    fn add_energy_j(&mut self, joules: f64) -> f64 {
        if joules.is_nan() || joules <= 0.0 {
            return 0.0;
        }
        let accepted = joules.min(self.capacity_j - self.remaining_j).max(0.0);
        self.remaining_j += accepted;
        self.update_depletion();
        accepted
    }

    fn draw_energy_j(&mut self, joules: f64) -> f64 {
        if joules.is_nan() || joules <= 0.0 {
            return 0.0;
        }
        let delivered = joules.min(self.remaining_j);
        self.remaining_j -= delivered;
        self.update_depletion();
        delivered
    }

    fn set_load_current_a(&mut self, current_a: f64) {
        self.load_current_a = current_a.max(0.0);
        self.update_depletion();
    }

    fn is_depleted(&self) -> bool {
        self.depleted
    }
}
