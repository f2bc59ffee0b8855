//! Circuit-wide defaults.
use crate::store::TrackPolicy;
use serde::{Serialize, Deserialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Rate used by nodes created without an explicit override.
    pub default_propagation_rate: f64,
    /// Input capacity of containers created without an explicit one.
    pub default_container_capacity: usize,
    pub track_policy: TrackPolicy,
    /// Tracked values at or above this level read as logic high.
    pub logic_threshold: f64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            default_propagation_rate: 1.0,
            default_container_capacity: 8,
            track_policy: TrackPolicy::Clamp,
            logic_threshold: 0.5,
        }
    }
}

impl CircuitConfig {
    /// Parses a JSON document. Missing fields fall back to the defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.default_propagation_rate;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::Invalid {
                field: "default_propagation_rate",
                reason: format!("{} is not a finite non-negative number", rate),
            });
        }
        if !self.logic_threshold.is_finite() {
            return Err(ConfigError::Invalid {
                field: "logic_threshold",
                reason: "must be finite".into(),
            });
        }
        Ok(())
    }
}
