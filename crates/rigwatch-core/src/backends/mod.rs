//! Concrete telemetry backends.
//!
//! Each backend implements [`Backend`](crate::probe::Backend). Linux sources
//! read procfs/sysfs directly; the GPU is reached through NVML, or
//! `nvidia-smi` when the library cannot be loaded.

pub mod cpu;
pub mod gpu;
pub mod helpers;
pub mod nvidia;
pub mod nvml;
pub mod procfs;
pub mod thermal;

pub use cpu::ProcStatLoad;
pub use gpu::{GpuDevice, GpuLink, GpuLoadBackend, GpuTempBackend};
pub use nvidia::NvidiaSmi;
pub use nvml::NvmlGpu;
pub use procfs::ProcfsNames;
pub use thermal::HwmonCpuTemp;
