//! Wall-clock access and local time-of-day formatting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of tick timestamps.
pub trait Clock: Send {
    /// Current time in seconds. Only differences are meaningful.
    fn now(&self) -> f64;

    /// Current wall-clock time, used to stamp snapshots.
    fn wall(&self) -> SystemTime;
}

/// The host's real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.wall()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    fn wall(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        let clock = Self::default();
        clock.set(start);
        clock
    }

    pub fn set(&self, secs: f64) {
        self.secs.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.secs.load(Ordering::SeqCst))
    }

    fn wall(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs_f64(self.now().max(0.0))
    }
}

/// Broken-down calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl LocalTime {
    /// Convert using the host time zone, falling back to UTC.
    pub fn from_system(t: SystemTime) -> Self {
        let secs = t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        local_breakdown(secs).unwrap_or_else(|| Self::utc(secs))
    }

    /// UTC breakdown of seconds since the Unix epoch. No leap seconds.
    pub fn utc(secs: u64) -> Self {
        let second = (secs % 60) as u32;
        let minute = ((secs / 60) % 60) as u32;
        let hour = ((secs / 3600) % 24) as u32;

        let mut days = secs / 86400;
        let mut year = 1970u32;
        loop {
            let days_in_year = if is_leap(year) { 366 } else { 365 };
            if days < days_in_year {
                break;
            }
            days -= days_in_year;
            year += 1;
        }

        let months_days: [u64; 12] = if is_leap(year) {
            [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
        } else {
            [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
        };
        let mut month = 1u32;
        for md in months_days {
            if days < md {
                break;
            }
            days -= md;
            month += 1;
        }

        Self {
            year,
            month,
            day: days as u32 + 1,
            hour,
            minute,
            second,
        }
    }

    pub fn clock_time(&self) -> ClockTime {
        ClockTime {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
        }
    }

    /// Compact stamp for file names, e.g. `20261018_142503`.
    pub fn file_stamp(&self) -> String {
        format!(
            "{:04}{:02}{:02}_{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

fn is_leap(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(unix)]
fn local_breakdown(secs: u64) -> Option<LocalTime> {
    let t = libc::time_t::try_from(secs).ok()?;
    // SAFETY: `tm` is plain old data; an all-zero value is valid.
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    // SAFETY: `localtime_r` reads `t` and writes only into `tm`, both valid
    // for the duration of the call. It returns null on failure.
    let res = unsafe { libc::localtime_r(&t, &mut tm) };
    if res.is_null() {
        return None;
    }
    Some(LocalTime {
        year: u32::try_from(tm.tm_year + 1900).ok()?,
        month: u32::try_from(tm.tm_mon + 1).ok()?,
        day: u32::try_from(tm.tm_mday).ok()?,
        hour: u32::try_from(tm.tm_hour).ok()?,
        minute: u32::try_from(tm.tm_min).ok()?,
        // tm_sec may be 60 on a leap second.
        second: u32::try_from(tm.tm_sec.min(59)).ok()?,
    })
}

#[cfg(not(unix))]
fn local_breakdown(_secs: u64) -> Option<LocalTime> {
    None
}

/// Time of day, displayed as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    pub fn local(t: SystemTime) -> Self {
        LocalTime::from_system(t).clock_time()
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}
