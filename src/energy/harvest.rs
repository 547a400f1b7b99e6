//! Harvesting policies and their validated configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, check_seconds};

/// Converts validated seconds into a duration (zero for unrepresentable input).
pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

/// Photovoltaic panel from which illumination-cycle power is derived.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarPanel {
    /// Panel area (m²).
    pub area_m2: f64,
    /// Conversion efficiency (0.0–1.0).
    pub efficiency: f64,
    /// Incident irradiance (W/m²).
    pub solar_constant_w_m2: f64,
}

impl Default for SolarPanel {
    fn default() -> Self {
        Self {
            area_m2: 2.0,
            efficiency: 0.28,
            solar_constant_w_m2: 1361.0,
        }
    }
}

impl SolarPanel {
    /// Electrical output while illuminated, in watts (J/s).
    pub fn power_w(&self) -> f64 {
        self.solar_constant_w_m2 * self.area_m2 * self.efficiency
    }

    fn validate(&self, errors: &mut Vec<ConfigError>) {
        if !self.area_m2.is_finite() || self.area_m2 < 0.0 {
            errors.push(ConfigError::new("policy.panel.area_m2", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.efficiency) {
            errors.push(ConfigError::new(
                "policy.panel.efficiency",
                "must be in [0.0, 1.0]",
            ));
        }
        if !self.solar_constant_w_m2.is_finite() || self.solar_constant_w_m2 < 0.0 {
            errors.push(ConfigError::new(
                "policy.panel.solar_constant_w_m2",
                "must be >= 0",
            ));
        }
    }
}

/// Constant-rate harvesting between two absolute timestamps, `[start_s, end_s)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixedWindow {
    /// Harvest power while the window is open (W).
    pub rate_w: f64,
    /// Window opening time (s, inclusive).
    pub start_s: f64,
    /// Window closing time (s, exclusive).
    pub end_s: f64,
}

impl Default for FixedWindow {
    fn default() -> Self {
        Self {
            rate_w: 500.0,
            start_s: 0.0,
            end_s: 1200.0,
        }
    }
}

impl FixedWindow {
    /// Window opening time.
    pub fn start(&self) -> Duration {
        secs(self.start_s)
    }

    /// Window closing time.
    pub fn end(&self) -> Duration {
        secs(self.end_s)
    }

    /// Returns `true` when `now` falls within the window.
    pub fn is_active(&self, now: Duration) -> bool {
        now >= self.start() && now < self.end()
    }
}

/// Repeating illumination/eclipse cycle, starting illuminated.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IlluminationCycle {
    /// Panel producing power while illuminated.
    pub panel: SolarPanel,
    /// Duration of each illuminated phase (s).
    pub illumination_s: f64,
    /// Duration of each eclipse phase (s).
    pub eclipse_s: f64,
}

impl Default for IlluminationCycle {
    fn default() -> Self {
        Self {
            panel: SolarPanel::default(),
            illumination_s: 3900.0,
            eclipse_s: 1800.0,
        }
    }
}

impl IlluminationCycle {
    /// Duration of each illuminated phase.
    pub fn illumination(&self) -> Duration {
        secs(self.illumination_s)
    }

    /// Duration of each eclipse phase.
    pub fn eclipse(&self) -> Duration {
        secs(self.eclipse_s)
    }

    /// Length of one full illumination + eclipse cycle.
    pub fn period(&self) -> Duration {
        self.illumination() + self.eclipse()
    }
}

/// The two mutually exclusive harvesting policies.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarvestPolicy {
    /// Harvest a constant rate inside an absolute time window.
    FixedWindow(FixedWindow),
    /// Harvest panel power only while illuminated, indefinitely.
    IlluminationCycle(IlluminationCycle),
}

impl Default for HarvestPolicy {
    fn default() -> Self {
        Self::IlluminationCycle(IlluminationCycle::default())
    }
}

impl HarvestPolicy {
    /// Short machine-readable policy name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedWindow(_) => "fixed_window",
            Self::IlluminationCycle(_) => "illumination_cycle",
        }
    }
}

/// Harvesting configuration: the active policy and its integration step.
///
/// # Examples
///
/// ```
/// use harvest_sim::energy::harvest::HarvestConfig;
///
/// let cfg = HarvestConfig::fixed_window(500.0, 0.0, 10.0, 1.0);
/// assert!(cfg.validate().is_empty());
///
/// let bad = HarvestConfig::fixed_window(500.0, 10.0, 0.0, 0.0);
/// assert_eq!(bad.validate().len(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Interval between harvest ticks (s).
    pub step_s: f64,
    /// Active harvesting policy.
    pub policy: HarvestPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            step_s: 1.0,
            policy: HarvestPolicy::default(),
        }
    }
}

impl HarvestConfig {
    /// Fixed-window policy harvesting `rate_w` over `[start_s, end_s)`.
    pub fn fixed_window(rate_w: f64, start_s: f64, end_s: f64, step_s: f64) -> Self {
        Self {
            step_s,
            policy: HarvestPolicy::FixedWindow(FixedWindow {
                rate_w,
                start_s,
                end_s,
            }),
        }
    }

    /// Illumination-cycle policy for `panel`.
    pub fn illumination_cycle(
        panel: SolarPanel,
        illumination_s: f64,
        eclipse_s: f64,
        step_s: f64,
    ) -> Self {
        Self {
            step_s,
            policy: HarvestPolicy::IlluminationCycle(IlluminationCycle {
                panel,
                illumination_s,
                eclipse_s,
            }),
        }
    }

    /// Harvest tick interval.
    pub fn step(&self) -> Duration {
        secs(self.step_s)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid. Field paths are
    /// relative to the harvest section (e.g., `"policy.end_s"`).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if check_seconds(&mut errors, "step_s", self.step_s) && self.step() == Duration::ZERO {
            errors.push(ConfigError::new("step_s", "must be > 0"));
        }

        match &self.policy {
            HarvestPolicy::FixedWindow(w) => {
                if !w.rate_w.is_finite() || w.rate_w < 0.0 {
                    errors.push(ConfigError::new("policy.rate_w", "must be >= 0"));
                }
                let start_ok = check_seconds(&mut errors, "policy.start_s", w.start_s);
                let end_ok = check_seconds(&mut errors, "policy.end_s", w.end_s);
                if start_ok && end_ok && w.start_s > w.end_s {
                    errors.push(ConfigError::new(
                        "policy.start_s",
                        "must be <= policy.end_s",
                    ));
                }
            }
            HarvestPolicy::IlluminationCycle(c) => {
                c.panel.validate(&mut errors);
                if check_seconds(&mut errors, "policy.illumination_s", c.illumination_s)
                    && c.illumination() == Duration::ZERO
                {
                    errors.push(ConfigError::new("policy.illumination_s", "must be > 0"));
                }
                if check_seconds(&mut errors, "policy.eclipse_s", c.eclipse_s)
                    && c.eclipse() == Duration::ZERO
                {
                    errors.push(ConfigError::new("policy.eclipse_s", "must be > 0"));
                }
            }
        }

        errors
    }

    /// Energy to inject for the tick starting at `now`.
    ///
    /// Uses the rate valid at the start of the tick; a phase change inside the
    /// tick interval is not interpolated.
    pub fn energy_for_tick(&self, now: Duration, illuminated: bool) -> f64 {
        match &self.policy {
            HarvestPolicy::IlluminationCycle(c) if illuminated => c.panel.power_w() * self.step_s,
            HarvestPolicy::IlluminationCycle(_) => 0.0,
            HarvestPolicy::FixedWindow(w) if w.is_active(now) => w.rate_w * self.step_s,
            HarvestPolicy::FixedWindow(_) => 0.0,
        }
    }
}
