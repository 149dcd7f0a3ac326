pub mod export;
pub mod monitor;
pub mod scan;
pub mod snapshot;

use std::path::Path;

use rigwatch_core::{Aggregator, ConfigError, MonitorConfig, Snapshot};

/// Load the config file if given, else defaults. Exits on error.
pub fn load_config(path: Option<&Path>) -> MonitorConfig {
    match resolve_config(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn resolve_config(path: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    match path {
        Some(p) => MonitorConfig::load(p),
        None => Ok(MonitorConfig::default()),
    }
}

/// Apply command-line overrides on top of the loaded config. Exits if the
/// result is invalid.
pub fn with_overrides(
    config: MonitorConfig,
    refresh: Option<f64>,
    background: bool,
) -> MonitorConfig {
    match apply_overrides(config, refresh, background) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn apply_overrides(
    mut config: MonitorConfig,
    refresh: Option<f64>,
    background: bool,
) -> Result<MonitorConfig, ConfigError> {
    if let Some(secs) = refresh {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "--refresh must be a positive number of seconds, got {secs}"
            )));
        }
        config.period_ms = (secs * 1000.0).round().max(1.0) as u64;
    }
    config.background_probes |= background;
    config.validate()?;
    Ok(config)
}

pub fn make_aggregator(config: &MonitorConfig) -> Aggregator {
    Aggregator::detect(config)
}

/// Tick twice, one period apart, so load and rate cover a real interval.
pub fn settled_snapshot(agg: &mut Aggregator, config: &MonitorConfig) -> Snapshot {
    agg.tick();
    std::thread::sleep(config.period());
    agg.tick()
}
