//! # rigwatch-core
//!
//! Fault-tolerant hardware telemetry sampling.
//!
//! `rigwatch-core` samples CPU load, CPU temperature, GPU load, GPU
//! temperature and the top GPU-memory process once per tick, from sources
//! that may be missing or flaky at any moment. A tick always produces a
//! complete [`Snapshot`]; a broken source only blanks its own field.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rigwatch_core::{Aggregator, MonitorConfig, RollingWindow};
//!
//! let config = MonitorConfig::default();
//! let mut agg = Aggregator::detect(&config);
//! let mut cpu_history = RollingWindow::new(config.window_capacity);
//!
//! let snapshot = agg.tick();
//! cpu_history.push(snapshot.cpu_load_display() as f64);
//! println!("{snapshot}");
//! ```
//!
//! ## Architecture
//!
//! Backends → Probes (init once, fault-isolated) → Aggregator → Snapshot
//!
//! - Every source implements the [`Backend`] trait.
//! - A [`Probe`] runs `init` once; a failed init means the source is never
//!   queried again. Query failures only affect that sample.
//! - The [`Aggregator`] owns all probes and is the only entry point.
//! - [`RollingWindow`], [`RateEstimator`] and [`TickScheduler`] are the
//!   pieces a dashboard builds on top.

pub mod aggregator;
pub mod backends;
pub mod clock;
pub mod config;
pub mod deferred;
pub mod error;
pub mod export;
pub mod probe;
pub mod process;
pub mod rate;
pub mod scheduler;
pub mod snapshot;
pub mod window;

pub use aggregator::{Aggregator, Backends};
pub use clock::{Clock, ClockTime, LocalTime, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use deferred::Deferred;
pub use error::{ConfigError, ProbeError};
pub use export::{EXPORT_HEADER, ExportRecord, export_log, write_csv};
pub use probe::{Availability, Backend, Probe, ProbeKind, ProbeStatus, Reading};
pub use process::{ActiveProcessBackend, ConsumerProcess, GpuProcess, ProcessTable};
pub use rate::RateEstimator;
pub use scheduler::TickScheduler;
pub use snapshot::Snapshot;
pub use window::RollingWindow;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
