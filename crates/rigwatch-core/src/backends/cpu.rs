//! Whole-machine CPU load from `/proc/stat`.

use std::path::PathBuf;

use super::helpers::clamp_percent;
use crate::error::ProbeError;
use crate::probe::Backend;

/// Aggregate CPU jiffies from the `cpu ` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct CpuTimes {
    busy: u64,
    idle: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.busy + self.idle
    }
}

fn parse_proc_stat(raw: &str) -> Result<CpuTimes, ProbeError> {
    let parse_err = || ProbeError::Parse {
        what: "/proc/stat cpu line",
        raw: raw.lines().next().unwrap_or_default().to_string(),
    };
    let rest = raw
        .lines()
        .find_map(|l| l.strip_prefix("cpu "))
        .ok_or_else(parse_err)?;
    let parts: Vec<u64> = rest
        .split_whitespace()
        .map(|s| s.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| parse_err())?;
    if parts.len() < 4 {
        return Err(parse_err());
    }
    // user nice system idle iowait irq softirq steal; guest time is already
    // folded into user/nice.
    let field = |i: usize| parts.get(i).copied().unwrap_or(0);
    let idle = field(3) + field(4);
    let busy = field(0) + field(1) + field(2) + field(5) + field(6) + field(7);
    Ok(CpuTimes { busy, idle })
}

/// CPU load in percent over the interval since the previous read.
///
/// `init` takes the baseline, so the first query already spans a real
/// interval.
pub struct ProcStatLoad {
    path: PathBuf,
    prev: CpuTimes,
    last_load: u32,
}

impl ProcStatLoad {
    pub fn new() -> Self {
        Self::with_path("/proc/stat")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prev: CpuTimes::default(),
            last_load: 0,
        }
    }

    fn read(&self) -> Result<CpuTimes, ProbeError> {
        let raw = std::fs::read_to_string(&self.path)?;
        parse_proc_stat(&raw)
    }
}

impl Default for ProcStatLoad {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ProcStatLoad {
    type Value = u32;

    fn init(&mut self) -> Result<(), ProbeError> {
        self.prev = self.read()?;
        Ok(())
    }

    fn query(&mut self) -> Result<u32, ProbeError> {
        let now = self.read()?;
        let total = now.total().saturating_sub(self.prev.total());
        let busy = now.busy.saturating_sub(self.prev.busy);
        self.prev = now;
        // No jiffies elapsed: keep the previous figure.
        if total > 0 {
            self.last_load = clamp_percent(busy as f64 * 100.0 / total as f64);
        }
        Ok(self.last_load)
    }
}
