//! CPU package temperature from Linux hwmon.

use std::path::{Path, PathBuf};

use super::helpers::{normalize_key, read_trimmed};
use crate::error::ProbeError;
use crate::probe::Backend;

/// hwmon chip names that report CPU temperatures.
const CPU_CHIPS: &[&str] = &["coretemp", "k10temp", "zenpower", "cpu_thermal"];

/// Labels naming the whole-package sensor.
const PACKAGE_LABELS: &[&str] = &["package", "tctl", "tdie"];

/// Reads one `temp*_input` file chosen at `init`.
pub struct HwmonCpuTemp {
    root: PathBuf,
    sensor: Option<PathBuf>,
}

impl HwmonCpuTemp {
    pub fn new() -> Self {
        Self::with_root("/sys/class/hwmon")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sensor: None,
        }
    }

    /// Path of the selected sensor, once initialized.
    pub fn sensor(&self) -> Option<&Path> {
        self.sensor.as_deref()
    }
}

impl Default for HwmonCpuTemp {
    fn default() -> Self {
        Self::new()
    }
}

fn is_package_label(label: &str) -> bool {
    let key = normalize_key(label);
    PACKAGE_LABELS.iter().any(|p| key.starts_with(p))
}

/// Pick the package sensor of the first CPU chip, else its first input.
fn find_cpu_sensor(root: &Path) -> Option<PathBuf> {
    let mut chips: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .collect();
    chips.sort();

    for dir in chips {
        let Some(chip) = read_trimmed(&dir.join("name")) else {
            continue;
        };
        if !CPU_CHIPS.contains(&chip.as_str()) {
            continue;
        }
        let Ok(files) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut inputs: Vec<PathBuf> = files
            .flatten()
            .map(|f| f.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy())
                    .is_some_and(|n| n.starts_with("temp") && n.ends_with("_input"))
            })
            .collect();
        inputs.sort();

        let package = inputs.iter().find(|input| {
            let Some(name) = input.file_name() else {
                return false;
            };
            let label = input.with_file_name(name.to_string_lossy().replace("_input", "_label"));
            read_trimmed(&label).is_some_and(|l| is_package_label(&l))
        });
        if let Some(found) = package.or(inputs.first()) {
            return Some(found.clone());
        }
    }
    None
}

fn read_millidegrees(path: &Path) -> Result<i32, ProbeError> {
    let raw = std::fs::read_to_string(path)?;
    let milli: i64 = raw.trim().parse().map_err(|_| ProbeError::Parse {
        what: "hwmon temperature",
        raw: raw.trim().to_string(),
    })?;
    Ok((milli / 1000) as i32)
}

impl Backend for HwmonCpuTemp {
    type Value = i32;

    fn init(&mut self) -> Result<(), ProbeError> {
        let sensor = find_cpu_sensor(&self.root).ok_or_else(|| {
            ProbeError::NotFound(format!("CPU temperature sensor under {}", self.root.display()))
        })?;
        read_millidegrees(&sensor)?;
        log::debug!("using CPU temperature sensor {}", sensor.display());
        self.sensor = Some(sensor);
        Ok(())
    }

    fn query(&mut self) -> Result<i32, ProbeError> {
        let sensor = self
            .sensor
            .as_deref()
            .ok_or_else(|| ProbeError::NotFound("CPU temperature sensor".to_string()))?;
        read_millidegrees(sensor)
    }
}
