//! Error types for probes and configuration.
//!
//! Probe errors never cross the aggregator boundary: they are recorded on the
//! probe's status and folded into a [`Reading`](crate::probe::Reading).

use std::time::Duration;

use thiserror::Error;

/// Failure of a single backend operation (initialization or one query).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("`{program}` failed: {reason}")]
    CommandFailed { program: String, reason: String },

    #[error("`{program}` timed out after {ms}ms", ms = .after.as_millis())]
    Timeout { program: String, after: Duration },

    #[error("could not parse {what}: {raw:?}")]
    Parse { what: &'static str, raw: String },

    #[error("GPU driver error: {0}")]
    Driver(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("process {0} no longer exists")]
    ProcessGone(u32),

    #[error("previous query still in flight")]
    InFlight,

    #[error("backend panicked")]
    Panicked,
}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Failure loading or validating a [`MonitorConfig`](crate::config::MonitorConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
