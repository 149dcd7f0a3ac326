//! Active GPU consumer resolution.
//!
//! Three outcomes are kept apart on purpose: no GPU backend at all
//! ([`ConsumerProcess::NotAvailable`]), a backend reporting nothing running
//! ([`ConsumerProcess::Idle`]), and a process that vanished between listing
//! and name lookup ([`ConsumerProcess::Unknown`]).

use serde::{Serialize, Serializer};

use crate::backends::gpu::GpuLink;
use crate::error::ProbeError;
use crate::probe::Backend;

/// One entry of a GPU's per-process memory list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuProcess {
    pub pid: u32,
    /// Bytes of GPU memory held by the process.
    pub used_memory: u64,
}

/// Resolves process identifiers to display names.
pub trait ProcessTable: Send + Sync {
    /// Fails with [`ProbeError::ProcessGone`] if the process has exited.
    fn name_of(&self, pid: u32) -> Result<String, ProbeError>;
}

/// The process currently holding the most GPU memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerProcess {
    Named(String),
    /// The GPU reports no processes.
    Idle,
    /// The top process could not be resolved to a name.
    Unknown,
    /// There is no GPU process backend.
    NotAvailable,
}

impl ConsumerProcess {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Idle => "Idle",
            Self::Unknown => "Unknown",
            Self::NotAvailable => "N/A",
        }
    }
}

impl std::fmt::Display for ConsumerProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConsumerProcess {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Entry with the largest `used_memory`; ties go to the earliest entry.
pub fn select_top_consumer(processes: &[GpuProcess]) -> Option<&GpuProcess> {
    let mut best: Option<&GpuProcess> = None;
    for p in processes {
        if best.is_none_or(|b| p.used_memory > b.used_memory) {
            best = Some(p);
        }
    }
    best
}

/// Backend reporting the top GPU memory consumer by name.
pub struct ActiveProcessBackend {
    link: GpuLink,
    table: Box<dyn ProcessTable>,
}

impl ActiveProcessBackend {
    pub fn new(link: GpuLink, table: Box<dyn ProcessTable>) -> Self {
        Self { link, table }
    }
}

impl Backend for ActiveProcessBackend {
    type Value = ConsumerProcess;

    fn init(&mut self) -> Result<(), ProbeError> {
        self.link.as_ref().map(|_| ()).map_err(ProbeError::clone)
    }

    fn query(&mut self) -> Result<ConsumerProcess, ProbeError> {
        let device = self.link.as_ref().map_err(ProbeError::clone)?;
        let processes = device.processes()?;
        let Some(top) = select_top_consumer(&processes) else {
            return Ok(ConsumerProcess::Idle);
        };
        match self.table.name_of(top.pid) {
            Ok(name) => Ok(ConsumerProcess::Named(name)),
            Err(e) => {
                log::debug!("could not resolve pid {}: {e}", top.pid);
                Ok(ConsumerProcess::Unknown)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Fixed pid-to-name map; any other pid is gone.
    #[derive(Debug, Default, Clone)]
    pub struct StaticTable(pub HashMap<u32, String>);

    impl StaticTable {
        pub fn with(entries: &[(u32, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(pid, name)| (*pid, name.to_string()))
                    .collect(),
            )
        }
    }

    impl ProcessTable for StaticTable {
        fn name_of(&self, pid: u32) -> Result<String, ProbeError> {
            self.0.get(&pid).cloned().ok_or(ProbeError::ProcessGone(pid))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::StaticTable;
    use super::*;
    use crate::backends::gpu::testing::FakeGpu;

    fn proc(pid: u32, used_memory: u64) -> GpuProcess {
        GpuProcess { pid, used_memory }
    }

    fn backend(gpu: FakeGpu, table: StaticTable) -> ActiveProcessBackend {
        let link: GpuLink = Ok(Arc::new(gpu));
        ActiveProcessBackend::new(link, Box::new(table))
    }

    #[test]
    fn top_consumer_by_memory() {
        let list = [proc(1, 100), proc(2, 500), proc(3, 200)];
        assert_eq!(select_top_consumer(&list).map(|p| p.pid), Some(2));
    }

    #[test]
    fn top_consumer_tie_goes_to_first_seen() {
        let list = [proc(7, 300), proc(8, 300), proc(9, 10)];
        assert_eq!(select_top_consumer(&list).map(|p| p.pid), Some(7));
        assert_eq!(select_top_consumer(&[]), None);
    }

    #[test]
    fn empty_list_is_idle() {
        let mut b = backend(FakeGpu::with_processes(vec![]), StaticTable::default());
        b.init().unwrap();
        assert_eq!(b.query().unwrap(), ConsumerProcess::Idle);
    }

    #[test]
    fn vanished_process_is_unknown() {
        let mut b = backend(
            FakeGpu::with_processes(vec![proc(42, 900)]),
            StaticTable::default(),
        );
        assert_eq!(b.query().unwrap(), ConsumerProcess::Unknown);
    }

    #[test]
    fn largest_consumer_is_named() {
        let mut b = backend(
            FakeGpu::with_processes(vec![proc(10, 100), proc(20, 500)]),
            StaticTable::with(&[(10, "small.exe"), (20, "big.exe")]),
        );
        assert_eq!(b.query().unwrap(), ConsumerProcess::Named("big.exe".into()));
    }

    #[test]
    fn missing_gpu_fails_init() {
        let mut b = ActiveProcessBackend::new(
            Err(ProbeError::NotFound("nvidia-smi".into())),
            Box::new(StaticTable::default()),
        );
        assert_eq!(b.init(), Err(ProbeError::NotFound("nvidia-smi".into())));
    }

    #[test]
    fn process_list_failure_is_an_error() {
        let mut gpu = FakeGpu::with_processes(vec![]);
        gpu.processes = Err(ProbeError::Io("driver reset".into()));
        let mut b = backend(gpu, StaticTable::default());
        assert!(b.query().is_err());
    }

    #[test]
    fn display_names() {
        assert_eq!(ConsumerProcess::Idle.to_string(), "Idle");
        assert_eq!(ConsumerProcess::Unknown.to_string(), "Unknown");
        assert_eq!(ConsumerProcess::NotAvailable.to_string(), "N/A");
        assert_eq!(ConsumerProcess::Named("demo.exe".into()).to_string(), "demo.exe");
        assert_eq!(
            serde_json::to_value(ConsumerProcess::NotAvailable).unwrap(),
            serde_json::json!("N/A")
        );
    }
}
