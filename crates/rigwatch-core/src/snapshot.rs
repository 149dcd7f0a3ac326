//! One tick's resolved telemetry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::probe::Reading;
use crate::process::ConsumerProcess;

/// Immutable record produced by [`Aggregator::tick`](crate::Aggregator::tick).
///
/// Readings keep absence explicit; the `*_display` accessors collapse it to
/// the sentinel `0` the way a dashboard shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Logical tick number, starting at 1.
    pub tick: u64,
    /// Wall-clock capture time, Unix milliseconds.
    pub taken_at: u64,
    /// Percent, `0..=100`.
    pub cpu_load: Reading<u32>,
    /// Degrees Celsius.
    pub cpu_temp: Reading<i32>,
    /// Percent, `0..=100`.
    pub gpu_load: Reading<u32>,
    /// Degrees Celsius.
    pub gpu_temp: Reading<i32>,
    /// Ticks per second.
    pub fps: u32,
    pub process: ConsumerProcess,
}

impl Snapshot {
    pub fn cpu_load_display(&self) -> u32 {
        self.cpu_load.or_sentinel(0)
    }

    pub fn cpu_temp_display(&self) -> i32 {
        self.cpu_temp.or_sentinel(0)
    }

    pub fn gpu_load_display(&self) -> u32 {
        self.gpu_load.or_sentinel(0)
    }

    pub fn gpu_temp_display(&self) -> i32 {
        self.gpu_temp.or_sentinel(0)
    }

    pub fn taken_at_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.taken_at)
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CPU {:>3}% {:>3}°C | GPU {:>3}% {:>3}°C | FPS {:>3} | {}",
            self.cpu_load_display(),
            self.cpu_temp_display(),
            self.gpu_load_display(),
            self.gpu_temp_display(),
            self.fps,
            self.process
        )
    }
}

pub(crate) fn unix_ms(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;

    fn sample() -> Snapshot {
        Snapshot {
            tick: 3,
            taken_at: 1_700_000_000_123,
            cpu_load: Reading::Ok(42),
            cpu_temp: Reading::Unavailable,
            gpu_load: Reading::Transient(ProbeError::InFlight),
            gpu_temp: Reading::Ok(55),
            fps: 1,
            process: ConsumerProcess::Idle,
        }
    }

    #[test]
    fn display_accessors_use_zero_sentinel() {
        let s = sample();
        assert_eq!(s.cpu_load_display(), 42);
        assert_eq!(s.cpu_temp_display(), 0);
        assert_eq!(s.gpu_load_display(), 0);
        assert_eq!(s.gpu_temp_display(), 55);
        // The distinction survives in the readings themselves.
        assert_ne!(s.cpu_temp, s.gpu_load.clone().map(|v| v as i32));
    }

    #[test]
    fn summary_line() {
        assert_eq!(
            sample().to_string(),
            "CPU  42%   0°C | GPU   0%  55°C | FPS   1 | Idle"
        );
    }

    #[test]
    fn taken_at_round_trips() {
        let s = sample();
        assert_eq!(unix_ms(s.taken_at_time()), s.taken_at);
    }

    #[test]
    fn serializes_readings_explicitly() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["cpu_load"]["value"], 42);
        assert_eq!(v["cpu_temp"]["status"], "unavailable");
        assert_eq!(v["gpu_load"]["status"], "transient");
        assert_eq!(v["process"], "Idle");
    }
}
