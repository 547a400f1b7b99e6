//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::energy::harvest::{HarvestConfig, IlluminationCycle, SolarPanel};
use crate::error::{ConfigError, check_seconds};
use crate::sim::types::SimConfig;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Battery-only aerial nodes.
    #[serde(default = "FleetConfig::uav")]
    pub uav: FleetConfig,
    /// Harvesting orbital nodes.
    #[serde(default = "FleetConfig::satellite")]
    pub satellite: FleetConfig,
}

/// Simulation timing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated horizon (s, must be > 0).
    pub duration_s: f64,
    /// Spacing of energy status samples (s, must be > 0).
    pub report_interval_s: f64,
    /// Spacing of consumer energy settlements (s, must be > 0).
    pub update_interval_s: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_s: 2400.0,
            report_interval_s: 20.0,
            update_interval_s: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Converts the validated timing into a [`SimConfig`].
    pub fn to_sim_config(&self) -> SimConfig {
        SimConfig::new(
            self.duration_s,
            self.report_interval_s,
            self.update_interval_s,
        )
    }
}

/// One homogeneous group of nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// Number of nodes in the group (0 disables it).
    #[serde(default)]
    pub count: usize,
    /// Per-node battery parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Harvesting parameters; `None` for battery-only nodes.
    #[serde(default)]
    pub harvest: Option<HarvestConfig>,
    /// Per-node consumer current profile.
    #[serde(default)]
    pub load: LoadConfig,
}

impl FleetConfig {
    /// Default aerial group: 10 battery-only nodes.
    pub fn uav() -> Self {
        Self {
            count: 10,
            battery: BatteryConfig {
                initial_energy_j: 1500.0,
                capacity_j: 1500.0,
                ..BatteryConfig::default()
            },
            harvest: None,
            load: LoadConfig {
                active_current_a: 2.33,
                active_start_s: 10.0,
                active_end_s: 1701.0,
                ..LoadConfig::default()
            },
        }
    }

    /// Default orbital group: 2 nodes harvesting 500 W over `[0, 1200)` s.
    pub fn satellite() -> Self {
        Self {
            count: 2,
            battery: BatteryConfig::default(),
            harvest: Some(HarvestConfig::fixed_window(500.0, 0.0, 1200.0, 1.0)),
            load: LoadConfig {
                active_current_a: 4.66,
                active_start_s: 10.0,
                active_end_s: 2301.0,
                ..LoadConfig::default()
            },
        }
    }

    fn validate(&self, prefix: &str, errors: &mut Vec<ConfigError>) {
        errors.extend(
            self.battery
                .validate()
                .into_iter()
                .map(|e| e.nested(&format!("{prefix}.battery"))),
        );
        if let Some(harvest) = &self.harvest {
            errors.extend(
                harvest
                    .validate()
                    .into_iter()
                    .map(|e| e.nested(&format!("{prefix}.harvest"))),
            );
        }
        errors.extend(
            self.load
                .validate()
                .into_iter()
                .map(|e| e.nested(&format!("{prefix}.load"))),
        );
    }
}

/// Lithium-ion battery parameters.
///
/// Defaults describe a 2000 J pack charged to capacity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Energy stored at start (J).
    pub initial_energy_j: f64,
    /// Maximum storable energy (J).
    pub capacity_j: f64,
    /// Open-circuit voltage when full (V).
    pub initial_cell_voltage: f64,
    /// Voltage across the flat part of the discharge curve (V).
    pub nominal_cell_voltage: f64,
    /// Voltage at the start of the discharge knee (V).
    pub exp_cell_voltage: f64,
    /// Internal series resistance (Ω).
    pub internal_resistance_ohm: f64,
    /// Cut-off voltage (V).
    pub threshold_voltage: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            initial_energy_j: 2000.0,
            capacity_j: 2000.0,
            initial_cell_voltage: 4.2,
            nominal_cell_voltage: 3.8,
            exp_cell_voltage: 3.5,
            internal_resistance_ohm: 0.05,
            threshold_voltage: 3.3,
        }
    }
}

impl BatteryConfig {
    /// Validates all fields and returns a list of errors.
    ///
    /// Field paths are relative to the battery section.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !self.capacity_j.is_finite() || self.capacity_j <= 0.0 {
            errors.push(ConfigError::new("capacity_j", "must be > 0"));
        }
        if !self.initial_energy_j.is_finite() || self.initial_energy_j < 0.0 {
            errors.push(ConfigError::new("initial_energy_j", "must be >= 0"));
        } else if self.initial_energy_j > self.capacity_j {
            errors.push(ConfigError::new("initial_energy_j", "must be <= capacity_j"));
        }

        let voltages = [
            ("initial_cell_voltage", self.initial_cell_voltage),
            ("nominal_cell_voltage", self.nominal_cell_voltage),
            ("exp_cell_voltage", self.exp_cell_voltage),
            ("threshold_voltage", self.threshold_voltage),
        ];
        for (field, v) in voltages {
            if !v.is_finite() || v <= 0.0 {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        }
        for pair in voltages.windows(2) {
            let (hi_field, hi) = pair[0];
            let (lo_field, lo) = pair[1];
            if hi < lo {
                errors.push(ConfigError::new(lo_field, format!("must be <= {hi_field}")));
            }
        }

        if !self.internal_resistance_ohm.is_finite() || self.internal_resistance_ohm < 0.0 {
            errors.push(ConfigError::new("internal_resistance_ohm", "must be >= 0"));
        }

        errors
    }
}

/// Consumer current profile: idle everywhere except one active window.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Current outside the active window (A).
    pub idle_current_a: f64,
    /// Current inside `[active_start_s, active_end_s)` (A).
    pub active_current_a: f64,
    pub active_start_s: f64,
    pub active_end_s: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            idle_current_a: 0.001,
            active_current_a: 0.0,
            active_start_s: 0.0,
            active_end_s: 0.0,
        }
    }
}

impl LoadConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (field, amps) in [
            ("idle_current_a", self.idle_current_a),
            ("active_current_a", self.active_current_a),
        ] {
            if !amps.is_finite() || amps < 0.0 {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }
        let start_ok = check_seconds(&mut errors, "active_start_s", self.active_start_s);
        let end_ok = check_seconds(&mut errors, "active_end_s", self.active_end_s);
        if start_ok && end_ok && self.active_start_s > self.active_end_s {
            errors.push(ConfigError::new("active_start_s", "must be <= active_end_s"));
        }
        errors
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: 10 UAVs and 2 satellites harvesting
    /// from a fixed 500 W window.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            uav: FleetConfig::uav(),
            satellite: FleetConfig::satellite(),
        }
    }

    /// Returns the low-Earth-orbit preset: satellites only, harvesting on the
    /// default illumination cycle over two full orbits.
    pub fn leo() -> Self {
        let orbit = IlluminationCycle::default();
        Self {
            simulation: SimulationConfig {
                duration_s: 2.0 * (orbit.illumination_s + orbit.eclipse_s),
                report_interval_s: 60.0,
                ..SimulationConfig::default()
            },
            uav: FleetConfig {
                count: 0,
                ..FleetConfig::uav()
            },
            satellite: FleetConfig {
                harvest: Some(HarvestConfig::default()),
                load: LoadConfig {
                    active_current_a: 0.1,
                    active_start_s: 0.0,
                    active_end_s: 2.0 * (orbit.illumination_s + orbit.eclipse_s),
                    ..LoadConfig::default()
                },
                ..FleetConfig::satellite()
            },
        }
    }

    /// Returns the eclipse-stress preset: a small panel, an eclipse longer
    /// than the lit phase, and a heavy continuous load.
    pub fn eclipse_stress() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 5400.0,
                report_interval_s: 60.0,
                ..SimulationConfig::default()
            },
            uav: FleetConfig {
                count: 0,
                ..FleetConfig::uav()
            },
            satellite: FleetConfig {
                count: 4,
                battery: BatteryConfig {
                    initial_energy_j: 1000.0,
                    ..BatteryConfig::default()
                },
                harvest: Some(HarvestConfig::illumination_cycle(
                    SolarPanel {
                        area_m2: 0.01,
                        ..SolarPanel::default()
                    },
                    1200.0,
                    2400.0,
                    1.0,
                )),
                load: LoadConfig {
                    active_current_a: 1.5,
                    active_start_s: 0.0,
                    active_end_s: 5400.0,
                    ..LoadConfig::default()
                },
            },
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "leo", "eclipse_stress"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "leo" => Ok(Self::leo()),
            "eclipse_stress" => Ok(Self::eclipse_stress()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        for (field, value) in [
            ("simulation.duration_s", s.duration_s),
            ("simulation.report_interval_s", s.report_interval_s),
            ("simulation.update_interval_s", s.update_interval_s),
        ] {
            if check_seconds(&mut errors, field, value)
                && Duration::try_from_secs_f64(value).unwrap_or_default().is_zero()
            {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        }

        if self.uav.harvest.is_some() {
            errors.push(ConfigError::new(
                "uav.harvest",
                "battery-only nodes cannot harvest",
            ));
        }
        self.uav.validate("uav", &mut errors);
        self.satellite.validate("satellite", &mut errors);

        if self.uav.count + self.satellite.count == 0 {
            errors.push(ConfigError::new(
                "satellite.count",
                "scenario must contain at least one node",
            ));
        }

        errors
    }
}
