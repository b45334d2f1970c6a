//! Resource Orchestrator configuration loading and validation.
//!
//! This crate provides:
//! - Typed structs for the YAML settings file
//! - Fail-fast semantic validation at load time
//! - Defaults matching the documented contract

pub mod settings;

pub use settings::{ConfigError, ResourceLimits, Settings};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
