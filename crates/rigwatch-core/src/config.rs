//! Monitor configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backends::helpers::COMMAND_TIMEOUT;
use crate::error::ConfigError;

/// Sampling settings. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Tick period in milliseconds.
    pub period_ms: u64,
    /// Samples kept in the rolling window.
    pub window_capacity: usize,
    /// Index of the GPU to open.
    pub gpu_index: u32,
    /// Bound on each external command, in milliseconds.
    pub command_timeout_ms: u64,
    /// Run slow probes on worker threads.
    pub background_probes: bool,
    /// Where CSV logs are written.
    pub export_dir: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            window_capacity: crate::window::DEFAULT_CAPACITY,
            gpu_index: 0,
            command_timeout_ms: COMMAND_TIMEOUT.as_millis() as u64,
            background_probes: false,
            export_dir: PathBuf::from("."),
        }
    }
}

impl MonitorConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::Invalid("period_ms must be non-zero".into()));
        }
        if self.command_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "command_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}
