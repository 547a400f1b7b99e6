//! Error types shared by configuration loading and the energy-source engine.

use thiserror::Error;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"satellite.harvest.step_s"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Creates a new error for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Re-roots the field path under `prefix`.
    pub fn nested(self, prefix: &str) -> Self {
        Self {
            field: format!("{prefix}.{}", self.field),
            message: self.message,
        }
    }
}

/// Lifecycle and configuration failures reported by energy sources.
#[derive(Debug, Error)]
pub enum EnergySourceError {
    /// One or more parameters violate their constraints.
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),
    /// Harvesting has already been started; configuration is frozen.
    #[error("harvesting already started")]
    AlreadyStarted,
    /// A battery is already bound to this source.
    #[error("a battery is already attached")]
    BatteryAlreadyAttached,
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks that `value` is a finite number of seconds representable as a duration.
pub(crate) fn check_seconds(errors: &mut Vec<ConfigError>, field: &str, value: f64) -> bool {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigError::new(field, "must be a finite number >= 0"));
        return false;
    }
    if std::time::Duration::try_from_secs_f64(value).is_err() {
        errors.push(ConfigError::new(field, "is too large"));
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_prefixes_field() {
        let e = ConfigError::new("step_s", "must be > 0").nested("satellite.harvest");
        assert_eq!(e.field, "satellite.harvest.step_s");
        assert_eq!(e.to_string(), "config error: satellite.harvest.step_s: must be > 0");
    }

    #[test]
    fn invalid_config_lists_every_field() {
        let err = EnergySourceError::InvalidConfig(vec![
            ConfigError::new("a", "bad"),
            ConfigError::new("b", "worse"),
        ]);
        assert_eq!(err.to_string(), "invalid configuration: a (bad); b (worse)");
    }

    #[test]
    fn check_seconds_rejects_negative_and_nan() {
        let mut errors = Vec::new();
        assert!(!check_seconds(&mut errors, "x", -1.0));
        assert!(!check_seconds(&mut errors, "y", f64::NAN));
        assert!(!check_seconds(&mut errors, "z", 1e300));
        assert!(check_seconds(&mut errors, "ok", 2.5));
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["x", "y", "z"]);
    }
}
