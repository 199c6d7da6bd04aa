//! Engine configuration
//!
//! Timing values are product feel, not correctness: only their relative
//! order matters to the lifecycle. The thresholds split a uniform draw in
//! [0, 1) into confirm / reject / no-response.

use crate::error::NearbyError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay between `create` and the start of resolution
    pub initial_delay_ms: u64,

    /// Lower bound of each provider's commit delay
    pub min_response_delay_ms: u64,

    /// Upper bound of each provider's commit delay
    pub max_response_delay_ms: u64,

    /// Draws above this confirm
    pub confirm_threshold: f64,

    /// Draws above this (and not above `confirm_threshold`) reject
    pub reject_threshold: f64,

    /// Seed for the random source; entropy when absent
    pub seed: Option<u64>,

    /// Buffer of the change-notification channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000,
            min_response_delay_ms: 500,
            max_response_delay_ms: 3000,
            confirm_threshold: 0.3,
            reject_threshold: 0.1,
            seed: None,
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Load and validate a YAML config file
    pub fn load(path: &str) -> Result<Self, NearbyError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NearbyError::Config(format!("failed to read {}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML content; missing fields keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self, NearbyError> {
        let config: EngineConfig =
            serde_yaml::from_str(yaml).map_err(|e| NearbyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NearbyError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.confirm_threshold) || !in_unit(self.reject_threshold) {
            return Err(NearbyError::Config(
                "thresholds must lie within [0, 1]".to_string(),
            ));
        }
        if self.reject_threshold > self.confirm_threshold {
            return Err(NearbyError::Config(format!(
                "reject_threshold {} exceeds confirm_threshold {}",
                self.reject_threshold, self.confirm_threshold
            )));
        }
        if self.min_response_delay_ms > self.max_response_delay_ms {
            return Err(NearbyError::Config(format!(
                "min_response_delay_ms {} exceeds max_response_delay_ms {}",
                self.min_response_delay_ms, self.max_response_delay_ms
            )));
        }
        if self.event_capacity == 0 {
            return Err(NearbyError::Config("event_capacity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Longest time from `create` until the last provider commit can land
    pub fn resolution_window(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms + self.max_response_delay_ms)
    }
}
