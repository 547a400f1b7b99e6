//! Core simulation types: run configuration and sampled node state.

use std::fmt;
use std::time::Duration;

/// Run-level simulation configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use harvest_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(2400.0, 20.0, 1.0);
/// assert_eq!(cfg.duration, Duration::from_secs(2400));
/// assert_eq!(cfg.expected_samples(), 121);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Simulated horizon; events at or after it do not run.
    pub duration: Duration,
    /// Spacing of energy status samples.
    pub report_interval: Duration,
    /// Spacing of consumer energy settlements.
    pub energy_update_interval: Duration,
}

impl SimConfig {
    /// Creates a new simulation configuration from seconds.
    ///
    /// # Panics
    ///
    /// Panics if any value is not a positive, finite number of seconds.
    pub fn new(duration_s: f64, report_interval_s: f64, energy_update_interval_s: f64) -> Self {
        let positive = |s: f64| {
            let d = Duration::try_from_secs_f64(s).unwrap_or_default();
            assert!(!d.is_zero(), "interval must be > 0, got {s}");
            d
        };
        Self {
            duration: positive(duration_s),
            report_interval: positive(report_interval_s),
            energy_update_interval: positive(energy_update_interval_s),
        }
    }

    /// Number of samples a run records: one per interval in `[0, duration)`
    /// plus the final sample at the horizon.
    pub fn expected_samples(&self) -> usize {
        let interval = self.report_interval.as_nanos();
        let periodic = self.duration.as_nanos().div_ceil(interval);
        periodic as usize + 1
    }
}

/// Role of a simulated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Battery-only aerial node.
    Uav,
    /// Battery + solar harvesting orbital node.
    Satellite,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Uav => "uav",
            Self::Satellite => "satellite",
        })
    }
}

/// Energy status of one node at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySample {
    /// Simulation time (s).
    pub time_s: f64,
    /// Node name (e.g., `"satellite-0"`).
    pub node: String,
    pub kind: NodeKind,
    /// Supply voltage under present load (V).
    pub voltage_v: f64,
    /// Remaining energy (J).
    pub remaining_j: f64,
    /// Remaining charge at nominal voltage (Ah).
    pub remaining_ah: f64,
    /// Illumination phase; `None` for nodes without a harvester.
    pub illuminated: Option<bool>,
    /// Cumulative harvested energy accepted by the battery (J).
    pub harvested_j: f64,
    /// Cumulative energy delivered to the node's load (J).
    pub consumed_j: f64,
    /// Whether the node's source is depleted.
    pub depleted: bool,
}

impl fmt::Display for EnergySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>7.1}s | {:<12} | V={:>5.3} V  E={:>9.2} J ({:.4} Ah) | harvested={:>9.2} J  consumed={:>9.2} J",
            self.time_s,
            self.node,
            self.voltage_v,
            self.remaining_j,
            self.remaining_ah,
            self.harvested_j,
            self.consumed_j,
        )?;
        match self.illuminated {
            Some(true) => write!(f, " | sun")?,
            Some(false) => write!(f, " | eclipse")?,
            None => {}
        }
        if self.depleted {
            write!(f, " | DEPLETED")?;
        }
        Ok(())
    }
}
