//! OutputsBlueprint - Config Loader output
//!
//! Describes the engine's worker layout and the configured output backends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete outputs configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputsBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Worker layout
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,

    /// Output backends, in registration order
    #[serde(default)]
    #[validate(nested)]
    pub outputs: Vec<OutputConfig>,
}

/// Worker layout of the packet engine
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Number of packet worker threads
    #[serde(default = "default_workers")]
    #[validate(range(min = 1, message = "workers must be >= 1"))]
    pub workers: usize,

    /// Period between stats snapshots (milliseconds)
    #[serde(default = "default_stats_interval_ms")]
    #[validate(range(min = 1, message = "stats_interval_ms must be >= 1"))]
    pub stats_interval_ms: u64,
}

fn default_workers() -> usize {
    2
}

fn default_stats_interval_ms() -> u64 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            stats_interval_ms: default_stats_interval_ms(),
        }
    }
}

/// One configured output backend instance
///
/// Several instances may share a module with different params.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputConfig {
    /// Instance label
    #[validate(length(min = 1, message = "output name cannot be empty"))]
    pub name: String,

    /// Module table key
    #[validate(length(min = 1, message = "output module cannot be empty"))]
    pub module: String,

    /// Disabled outputs are never registered
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Backend-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl OutputConfig {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            enabled: true,
            params: HashMap::new(),
        }
    }

    /// Add a backend parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl OutputsBlueprint {
    /// Outputs that will be registered, in order
    pub fn enabled_outputs(&self) -> impl Iterator<Item = &OutputConfig> {
        self.outputs.iter().filter(|output| output.enabled)
    }
}
