//! NVIDIA GPUs through NVML, the driver's management library.
//!
//! Preferred over [`NvidiaSmi`](super::NvidiaSmi) when `libnvidia-ml` can be
//! loaded: queries are in-process calls rather than subprocesses, and the
//! process list includes graphics contexts (games) as well as compute ones.

use std::sync::Arc;

use nvml_wrapper::{Device, Nvml};
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::enums::device::UsedGpuMemory;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::struct_wrappers::device::ProcessInfo;

use super::gpu::{GpuDevice, GpuLink};
use crate::error::ProbeError;
use crate::process::GpuProcess;

/// One GPU opened through NVML.
///
/// The library handle is kept; the device handle is looked up per query.
pub struct NvmlGpu {
    nvml: Nvml,
    index: u32,
    name: String,
}

impl NvmlGpu {
    /// Load NVML and open GPU `index`.
    pub fn open(index: u32) -> Result<Self, ProbeError> {
        let nvml = Nvml::init().map_err(driver_error)?;
        let name = nvml
            .device_by_index(index)
            .and_then(|d| d.name())
            .map_err(driver_error)?;
        log::info!("opened GPU {index} via NVML: {name}");
        Ok(Self { nvml, index, name })
    }

    /// Open GPU `index` as a shareable link.
    pub fn link(index: u32) -> GpuLink {
        Self::open(index).map(|gpu| Arc::new(gpu) as Arc<dyn GpuDevice>)
    }

    fn device(&self) -> Result<Device<'_>, ProbeError> {
        self.nvml.device_by_index(self.index).map_err(driver_error)
    }
}

impl GpuDevice for NvmlGpu {
    fn name(&self) -> &str {
        &self.name
    }

    fn utilization(&self) -> Result<u32, ProbeError> {
        let rates = self.device()?.utilization_rates().map_err(driver_error)?;
        Ok(rates.gpu)
    }

    fn temperature(&self) -> Result<i32, ProbeError> {
        let celsius = self
            .device()?
            .temperature(TemperatureSensor::Gpu)
            .map_err(driver_error)?;
        Ok(i32::try_from(celsius).unwrap_or(i32::MAX))
    }

    fn processes(&self) -> Result<Vec<GpuProcess>, ProbeError> {
        let device = self.device()?;
        let graphics = device.running_graphics_processes().map_err(driver_error)?;
        let compute = match device.running_compute_processes() {
            Ok(list) => list,
            Err(e) => {
                log::debug!("compute process list unavailable: {e}");
                Vec::new()
            }
        };
        Ok(merge_processes(
            graphics.iter().map(to_gpu_process),
            compute.iter().map(to_gpu_process),
        ))
    }
}

fn driver_error(e: NvmlError) -> ProbeError {
    ProbeError::Driver(e.to_string())
}

fn to_gpu_process(info: &ProcessInfo) -> GpuProcess {
    let used_memory = match info.used_gpu_memory {
        UsedGpuMemory::Used(bytes) => bytes,
        _ => 0,
    };
    GpuProcess {
        pid: info.pid,
        used_memory,
    }
}

/// Graphics processes first, then compute-only ones. A pid holding both
/// kinds of context appears once, with the larger memory figure.
fn merge_processes(
    graphics: impl IntoIterator<Item = GpuProcess>,
    compute: impl IntoIterator<Item = GpuProcess>,
) -> Vec<GpuProcess> {
    let mut out: Vec<GpuProcess> = Vec::new();
    for p in graphics.into_iter().chain(compute) {
        match out.iter_mut().find(|seen| seen.pid == p.pid) {
            Some(seen) => seen.used_memory = seen.used_memory.max(p.used_memory),
            None => out.push(p),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, mib: u64) -> GpuProcess {
        GpuProcess {
            pid,
            used_memory: mib * 1024 * 1024,
        }
    }

    #[test]
    fn graphics_processes_come_first() {
        let merged = merge_processes(vec![proc(10, 900)], vec![proc(20, 100)]);
        assert_eq!(merged, vec![proc(10, 900), proc(20, 100)]);
    }

    #[test]
    fn shared_pid_is_listed_once() {
        let merged = merge_processes(vec![proc(10, 300), proc(11, 50)], vec![proc(10, 700)]);
        assert_eq!(merged, vec![proc(10, 700), proc(11, 50)]);
    }

    #[test]
    fn graphics_only_game_is_visible() {
        let merged = merge_processes(vec![proc(4242, 2048)], Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pid, 4242);
    }

    #[test]
    #[ignore] // Requires an NVIDIA GPU and libnvidia-ml
    fn open_real_gpu() {
        let gpu = NvmlGpu::open(0).unwrap();
        assert!(!gpu.name().is_empty());
        assert!(gpu.utilization().unwrap() <= 100);
        gpu.processes().unwrap();
    }
}
