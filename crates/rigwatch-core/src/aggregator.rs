//! Per-tick orchestration of every probe.

use crate::backends::{
    GpuLink, GpuLoadBackend, GpuTempBackend, HwmonCpuTemp, NvidiaSmi, NvmlGpu, ProcStatLoad,
    ProcfsNames,
};
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::deferred::Deferred;
use crate::error::ProbeError;
use crate::probe::{Backend, Probe, ProbeKind, ProbeStatus, Reading};
use crate::process::{ActiveProcessBackend, ConsumerProcess};
use crate::rate::RateEstimator;
use crate::snapshot::{Snapshot, unix_ms};

/// One backend per telemetry source.
pub struct Backends {
    pub cpu_load: Box<dyn Backend<Value = u32>>,
    pub cpu_temp: Box<dyn Backend<Value = i32>>,
    pub gpu_load: Box<dyn Backend<Value = u32>>,
    pub gpu_temp: Box<dyn Backend<Value = i32>>,
    pub gpu_process: Box<dyn Backend<Value = ConsumerProcess>>,
}

impl Backends {
    /// Platform backends. The GPU is opened once here and shared.
    pub fn detect(config: &MonitorConfig) -> Self {
        let link = open_gpu(config);
        if let Err(e) = &link {
            log::info!("no GPU link: {e}");
        }
        let backends = Self {
            cpu_load: Box::new(ProcStatLoad::new()),
            cpu_temp: Box::new(HwmonCpuTemp::new()),
            gpu_load: Box::new(GpuLoadBackend::new(link.clone())),
            gpu_temp: Box::new(GpuTempBackend::new(link.clone())),
            gpu_process: Box::new(ActiveProcessBackend::new(link, Box::new(ProcfsNames::new()))),
        };
        if config.background_probes {
            backends.deferred()
        } else {
            backends
        }
    }

    /// Move the slow sources (sensor reads and GPU driver calls) onto
    /// background workers.
    pub fn deferred(self) -> Self {
        Self {
            cpu_load: self.cpu_load,
            cpu_temp: Box::new(Deferred::new(self.cpu_temp)),
            gpu_load: Box::new(Deferred::new(self.gpu_load)),
            gpu_temp: Box::new(Deferred::new(self.gpu_temp)),
            gpu_process: Box::new(Deferred::new(self.gpu_process)),
        }
    }
}

/// NVML when the library loads, otherwise `nvidia-smi`.
fn open_gpu(config: &MonitorConfig) -> GpuLink {
    match NvmlGpu::link(config.gpu_index) {
        Ok(gpu) => Ok(gpu),
        Err(e) => {
            log::debug!("NVML unavailable ({e}), falling back to nvidia-smi");
            NvidiaSmi::link(config.gpu_index, config.command_timeout())
        }
    }
}

/// Owns every probe and turns one tick into one [`Snapshot`].
///
/// Probe failures never escape: an unavailable or failing source shows up
/// in its own field and nowhere else. Loads are clamped to 0-100 whatever
/// the backend reports.
///
/// While a background process lookup is still running, the process field
/// repeats the last resolved value (or `Unknown` before the first one), so
/// `Unknown` keeps meaning a failed lookup.
pub struct Aggregator {
    cpu_load: Probe<u32>,
    cpu_temp: Probe<i32>,
    gpu_load: Probe<u32>,
    gpu_temp: Probe<i32>,
    gpu_process: Probe<ConsumerProcess>,
    last_process: Option<ConsumerProcess>,
    rate: RateEstimator,
    clock: Box<dyn Clock>,
    tick: u64,
}

impl Aggregator {
    /// Initialize every probe exactly once.
    pub fn new(backends: Backends, clock: Box<dyn Clock>) -> Self {
        let mut agg = Self {
            cpu_load: Probe::new(ProbeKind::CpuLoad, backends.cpu_load),
            cpu_temp: Probe::new(ProbeKind::CpuTemp, backends.cpu_temp),
            gpu_load: Probe::new(ProbeKind::GpuLoad, backends.gpu_load),
            gpu_temp: Probe::new(ProbeKind::GpuTemp, backends.gpu_temp),
            gpu_process: Probe::new(ProbeKind::GpuProcess, backends.gpu_process),
            last_process: None,
            rate: RateEstimator::new(clock.now()),
            clock,
            tick: 0,
        };
        agg.cpu_load.initialize();
        agg.cpu_temp.initialize();
        agg.gpu_load.initialize();
        agg.gpu_temp.initialize();
        agg.gpu_process.initialize();

        let available = agg
            .probe_report()
            .iter()
            .filter(|s| s.availability.is_available())
            .count();
        log::info!("{available}/{} probes available", ProbeKind::ALL.len());
        agg
    }

    /// Detect platform backends and use the system clock.
    pub fn detect(config: &MonitorConfig) -> Self {
        Self::new(Backends::detect(config), Box::new(SystemClock))
    }

    /// Sample every probe once. Never fails.
    pub fn tick(&mut self) -> Snapshot {
        self.tick += 1;

        let cpu_load = self.cpu_load.sample().map(|v| v.min(100));
        let cpu_temp = self.cpu_temp.sample();
        let gpu_load = self.gpu_load.sample().map(|v| v.min(100));
        let gpu_temp = self.gpu_temp.sample();
        let process = self.sample_process();
        let fps = self.rate.record_tick(self.clock.now());

        Snapshot {
            tick: self.tick,
            taken_at: unix_ms(self.clock.wall()),
            cpu_load,
            cpu_temp,
            gpu_load,
            gpu_temp,
            fps,
            process,
        }
    }

    fn sample_process(&mut self) -> ConsumerProcess {
        match self.gpu_process.sample() {
            Reading::Ok(p) => {
                self.last_process = Some(p.clone());
                p
            }
            Reading::Unavailable => ConsumerProcess::NotAvailable,
            Reading::Transient(ProbeError::InFlight) => self
                .last_process
                .clone()
                .unwrap_or(ConsumerProcess::Unknown),
            Reading::Transient(_) => {
                self.last_process = None;
                ConsumerProcess::Unknown
            }
        }
    }

    /// Health of each probe, in [`ProbeKind::ALL`] order.
    pub fn probe_report(&self) -> Vec<ProbeStatus> {
        vec![
            self.cpu_load.status(),
            self.cpu_temp.status(),
            self.gpu_load.status(),
            self.gpu_temp.status(),
            self.gpu_process.status(),
        ]
    }

    /// Re-run initialization of one probe.
    pub fn reinitialize(&mut self, kind: ProbeKind) -> ProbeStatus {
        match kind {
            ProbeKind::CpuLoad => self.cpu_load.reinitialize(),
            ProbeKind::CpuTemp => self.cpu_temp.reinitialize(),
            ProbeKind::GpuLoad => self.gpu_load.reinitialize(),
            ProbeKind::GpuTemp => self.gpu_temp.reinitialize(),
            ProbeKind::GpuProcess => self.gpu_process.reinitialize(),
        };
        self.status(kind)
    }

    pub fn status(&self, kind: ProbeKind) -> ProbeStatus {
        match kind {
            ProbeKind::CpuLoad => self.cpu_load.status(),
            ProbeKind::CpuTemp => self.cpu_temp.status(),
            ProbeKind::GpuLoad => self.gpu_load.status(),
            ProbeKind::GpuTemp => self.gpu_temp.status(),
            ProbeKind::GpuProcess => self.gpu_process.status(),
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}
