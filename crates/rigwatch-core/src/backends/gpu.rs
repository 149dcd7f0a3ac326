//! GPU device abstraction and the load/temperature backends built on it.
//!
//! The device is opened once at startup; the resulting [`GpuLink`] is shared
//! by every GPU backend instead of living in global state.

use std::sync::Arc;

use crate::error::ProbeError;
use crate::probe::Backend;
use crate::process::GpuProcess;

/// An opened GPU.
pub trait GpuDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Core utilization in percent.
    fn utilization(&self) -> Result<u32, ProbeError>;

    /// Core temperature in degrees Celsius.
    fn temperature(&self) -> Result<i32, ProbeError>;

    /// Processes holding GPU memory, in driver order.
    fn processes(&self) -> Result<Vec<GpuProcess>, ProbeError>;
}

/// Outcome of opening the GPU, shared by all GPU backends.
pub type GpuLink = Result<Arc<dyn GpuDevice>, ProbeError>;

fn device(link: &GpuLink) -> Result<&Arc<dyn GpuDevice>, ProbeError> {
    link.as_ref().map_err(ProbeError::clone)
}

/// GPU utilization backend.
pub struct GpuLoadBackend {
    link: GpuLink,
}

impl GpuLoadBackend {
    pub fn new(link: GpuLink) -> Self {
        Self { link }
    }
}

impl Backend for GpuLoadBackend {
    type Value = u32;

    fn init(&mut self) -> Result<(), ProbeError> {
        device(&self.link).map(|_| ())
    }

    fn query(&mut self) -> Result<u32, ProbeError> {
        Ok(device(&self.link)?.utilization()?.min(100))
    }
}

/// GPU temperature backend.
pub struct GpuTempBackend {
    link: GpuLink,
}

impl GpuTempBackend {
    pub fn new(link: GpuLink) -> Self {
        Self { link }
    }
}

impl Backend for GpuTempBackend {
    type Value = i32;

    fn init(&mut self) -> Result<(), ProbeError> {
        device(&self.link).map(|_| ())
    }

    fn query(&mut self) -> Result<i32, ProbeError> {
        device(&self.link)?.temperature()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeGpu;
    use super::*;

    #[test]
    fn backends_share_one_device() {
        let gpu = FakeGpu::new(37, 61);
        let queries = gpu.queries.clone();
        let link: GpuLink = Ok(Arc::new(gpu));

        let mut load = GpuLoadBackend::new(link.clone());
        let mut temp = GpuTempBackend::new(link);
        load.init().unwrap();
        temp.init().unwrap();

        assert_eq!(load.query().unwrap(), 37);
        assert_eq!(temp.query().unwrap(), 61);
        assert_eq!(queries.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_link_fails_init() {
        let link: GpuLink = Err(ProbeError::NotFound("gpu 0".into()));
        assert!(GpuLoadBackend::new(link.clone()).init().is_err());
        assert!(GpuTempBackend::new(link).init().is_err());
    }

    #[test]
    fn utilization_is_capped() {
        let link: GpuLink = Ok(Arc::new(FakeGpu::new(250, 0)));
        assert_eq!(GpuLoadBackend::new(link).query().unwrap(), 100);
    }
}
