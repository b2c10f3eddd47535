// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topology engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Topology engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Instance name, used in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Delay before the first probe pass (milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Period between probe passes (seconds)
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Drop links not re-verified within this many seconds.
    /// Unset means links only go away on port or switch loss.
    #[serde(default)]
    pub link_timeout_secs: Option<u64>,

    /// How often the expiry sweeper runs (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Log filter for the binary (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_name() -> String {
    "sdn-topology".into()
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_probe_interval() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            initial_delay_ms: default_initial_delay(),
            probe_interval_secs: default_probe_interval(),
            link_timeout_secs: None,
            sweep_interval_secs: default_sweep_interval(),
            log_level: default_log_level(),
        }
    }
}

impl TopologyConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Link expiry timeout, if expiry is enabled.
    pub fn link_timeout(&self) -> Option<Duration> {
        self.link_timeout_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name cannot be empty".into()));
        }
        if self.probe_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "probe_interval_secs cannot be 0".into(),
            ));
        }
        if let Some(timeout) = self.link_timeout_secs {
            if self.sweep_interval_secs == 0 {
                return Err(ConfigError::Invalid(
                    "sweep_interval_secs cannot be 0 when link_timeout_secs is set".into(),
                ));
            }
            // A link must survive at least one missed reply
            if timeout <= self.probe_interval_secs {
                return Err(ConfigError::Invalid(format!(
                    "link_timeout_secs ({}) must exceed probe_interval_secs ({})",
                    timeout, self.probe_interval_secs
                )));
            }
        }
        Ok(())
    }
}
