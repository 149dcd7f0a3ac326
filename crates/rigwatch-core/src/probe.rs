//! Backend probe trait and runtime state.
//!
//! Every telemetry source implements the [`Backend`] trait: a fallible,
//! once-only `init` and a fallible, repeatable `query`. A [`Probe`] wraps one
//! backend and enforces the capability contract around it:
//!
//! - `init` runs at most once; a failure makes the probe permanently
//!   unavailable and no further I/O is attempted.
//! - each `query` failure is reported for that sample only.
//! - panics inside a backend are contained and treated like failures.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use crate::error::ProbeError;

/// The telemetry source a probe reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Whole-machine CPU utilization.
    CpuLoad,
    /// CPU package temperature.
    CpuTemp,
    /// GPU utilization.
    GpuLoad,
    /// GPU core temperature.
    GpuTemp,
    /// Process holding the most GPU memory.
    GpuProcess,
}

impl ProbeKind {
    /// All kinds, in snapshot field order.
    pub const ALL: [ProbeKind; 5] = [
        Self::CpuLoad,
        Self::CpuTemp,
        Self::GpuLoad,
        Self::GpuTemp,
        Self::GpuProcess,
    ];
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CpuLoad => write!(f, "cpu_load"),
            Self::CpuTemp => write!(f, "cpu_temp"),
            Self::GpuLoad => write!(f, "gpu_load"),
            Self::GpuTemp => write!(f, "gpu_temp"),
            Self::GpuProcess => write!(f, "gpu_process"),
        }
    }
}

/// Outcome of a probe's one-time initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// `initialize` has not run yet.
    Pending,
    Available,
    /// Initialization failed; the probe reports unavailable for its lifetime.
    Unavailable(ProbeError),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Available => write!(f, "available"),
            Self::Unavailable(e) => write!(f, "unavailable ({e})"),
        }
    }
}

/// One sample from one probe.
///
/// Keeps "no backend" apart from "backend failed this time" even though a
/// display usually collapses both to the same sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Reading<T> {
    Ok(T),
    /// The probe never initialized; nothing was queried.
    Unavailable,
    /// The probe is available but this query failed.
    Transient(#[serde(serialize_with = "serialize_display")] ProbeError),
}

impl<T> Reading<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Self::Ok(v) => Reading::Ok(f(v)),
            Self::Unavailable => Reading::Unavailable,
            Self::Transient(e) => Reading::Transient(e),
        }
    }
}

impl<T: Copy> Reading<T> {
    /// The value, or `sentinel` when absent for any reason.
    pub fn or_sentinel(&self, sentinel: T) -> T {
        match self {
            Self::Ok(v) => *v,
            _ => sentinel,
        }
    }
}

fn serialize_display<S: Serializer>(e: &ProbeError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(e)
}

/// Contract every telemetry backend implements.
///
/// `init` is called at most once per probe by [`Probe::initialize`] (again
/// only through [`Probe::reinitialize`]). `query` is only called after a
/// successful `init` and performs exactly one underlying read.
pub trait Backend: Send {
    type Value;

    /// Connect to the underlying source.
    fn init(&mut self) -> Result<(), ProbeError>;

    /// Perform one read.
    fn query(&mut self) -> Result<Self::Value, ProbeError>;
}

/// Health record for one probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeStatus {
    pub kind: ProbeKind,
    #[serde(serialize_with = "serialize_availability")]
    pub availability: Availability,
    /// Queries that reached the backend.
    pub samples: u64,
    /// Queries that failed.
    pub failures: u64,
    /// Samples answered `Unavailable` without touching the backend.
    pub skipped: u64,
    #[serde(serialize_with = "serialize_opt_display")]
    pub last_error: Option<ProbeError>,
    /// Duration of the last query, in seconds.
    pub last_query_time: f64,
}

fn serialize_availability<S: Serializer>(a: &Availability, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(a)
}

fn serialize_opt_display<S: Serializer>(e: &Option<ProbeError>, s: S) -> Result<S::Ok, S::Error> {
    match e {
        Some(e) => s.collect_str(e),
        None => s.serialize_none(),
    }
}

/// A capability-checked handle to one telemetry backend.
pub struct Probe<T> {
    kind: ProbeKind,
    backend: Box<dyn Backend<Value = T>>,
    availability: Availability,
    samples: u64,
    failures: u64,
    skipped: u64,
    last_error: Option<ProbeError>,
    last_query_time: Duration,
}

impl<T> Probe<T> {
    pub fn new(kind: ProbeKind, backend: Box<dyn Backend<Value = T>>) -> Self {
        Self {
            kind,
            backend,
            availability: Availability::Pending,
            samples: 0,
            failures: 0,
            skipped: 0,
            last_error: None,
            last_query_time: Duration::ZERO,
        }
    }

    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    /// Run the backend's `init` if it has not run yet.
    pub fn initialize(&mut self) -> Availability {
        if self.availability == Availability::Pending {
            self.availability = self.run_init();
        }
        self.availability.clone()
    }

    /// Re-run `init` unconditionally.
    pub fn reinitialize(&mut self) -> Availability {
        self.availability = self.run_init();
        self.availability.clone()
    }

    fn run_init(&mut self) -> Availability {
        let backend = &mut self.backend;
        let outcome = catch_unwind(AssertUnwindSafe(|| backend.init()))
            .unwrap_or(Err(ProbeError::Panicked));
        match outcome {
            Ok(()) => {
                log::info!("{} probe available", self.kind);
                Availability::Available
            }
            Err(e) => {
                log::warn!("{} probe unavailable: {e}", self.kind);
                Availability::Unavailable(e)
            }
        }
    }

    /// Take one sample.
    ///
    /// An uninitialized or unavailable probe answers `Unavailable` without
    /// calling the backend.
    pub fn sample(&mut self) -> Reading<T> {
        if !self.availability.is_available() {
            self.skipped += 1;
            return Reading::Unavailable;
        }

        let t0 = Instant::now();
        let backend = &mut self.backend;
        let outcome = catch_unwind(AssertUnwindSafe(|| backend.query()))
            .unwrap_or(Err(ProbeError::Panicked));
        self.last_query_time = t0.elapsed();
        self.samples += 1;

        match outcome {
            Ok(v) => {
                self.last_error = None;
                Reading::Ok(v)
            }
            Err(e) => {
                log::debug!("{} sample failed: {e}", self.kind);
                self.failures += 1;
                self.last_error = Some(e.clone());
                Reading::Transient(e)
            }
        }
    }

    pub fn status(&self) -> ProbeStatus {
        ProbeStatus {
            kind: self.kind,
            availability: self.availability.clone(),
            samples: self.samples,
            failures: self.failures,
            skipped: self.skipped,
            last_error: self.last_error.clone(),
            last_query_time: self.last_query_time.as_secs_f64(),
        }
    }
}
