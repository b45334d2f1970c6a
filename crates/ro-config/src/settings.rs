//! YAML settings file for the orchestrator.
//!
//! Public-mode keys: `alpha`, `beta` (reward weights). Private-mode key:
//! `resource_limits` mapping `cpu`/`memory`/`network` to a fraction of the
//! cluster total in [0, 1]. Validation is eager: a limit outside [0, 1] or
//! a negative weight is rejected at load time, before any orchestration
//! starts.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors while loading or validating the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("resource limit for {resource} must be between 0 and 1, got {value}")]
    LimitOutOfRange { resource: String, value: f64 },

    #[error("reward weight {name} must be non-negative, got {value}")]
    NegativeWeight { name: String, value: f64 },
}

/// Fractional resource limits relative to cluster-total allocatable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default = "default_cpu_fraction")]
    pub cpu: f64,
    #[serde(default = "default_memory_fraction")]
    pub memory: f64,
    #[serde(default = "default_network_fraction")]
    pub network: f64,
}

fn default_cpu_fraction() -> f64 {
    0.8
}

fn default_memory_fraction() -> f64 {
    0.7
}

fn default_network_fraction() -> f64 {
    0.5
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits {
            cpu: default_cpu_fraction(),
            memory: default_memory_fraction(),
            network: default_network_fraction(),
        }
    }
}

impl ResourceLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (resource, value) in [
            ("cpu", self.cpu),
            ("memory", self.memory),
            ("network", self.network),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::LimitOutOfRange {
                    resource: resource.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Orchestrator settings file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Performance weight (public mode).
    #[serde(default)]
    pub alpha: Option<f64>,

    /// Cost weight (public mode).
    #[serde(default)]
    pub beta: Option<f64>,

    /// Fractional resource limits (private mode).
    #[serde(default)]
    pub resource_limits: Option<ResourceLimits>,
}

impl Settings {
    /// Load and validate settings from a YAML file.
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic validation; called by [`Settings::load`] but also usable on
    /// hand-built settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if let Some(v) = value {
                if v < 0.0 {
                    return Err(ConfigError::NegativeWeight {
                        name: name.to_string(),
                        value: v,
                    });
                }
            }
        }
        if let Some(limits) = &self.resource_limits {
            limits.validate()?;
        }
        Ok(())
    }

    /// Reward weights with the documented 0.5/0.5 defaults.
    pub fn reward_weights(&self) -> (f64, f64) {
        (self.alpha.unwrap_or(0.5), self.beta.unwrap_or(0.5))
    }

    /// Resource limits, falling back to the documented defaults.
    pub fn limits_or_default(&self) -> ResourceLimits {
        self.resource_limits.unwrap_or_default()
    }
}
