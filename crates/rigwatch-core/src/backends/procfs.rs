//! Process names from `/proc/<pid>/comm`.

use std::path::PathBuf;

use super::helpers::read_trimmed;
use crate::error::ProbeError;
use crate::process::ProcessTable;

pub struct ProcfsNames {
    root: PathBuf,
}

impl ProcfsNames {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcfsNames {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for ProcfsNames {
    fn name_of(&self, pid: u32) -> Result<String, ProbeError> {
        read_trimmed(&self.root.join(pid.to_string()).join("comm"))
            .ok_or(ProbeError::ProcessGone(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_comm() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("4242")).unwrap();
        std::fs::write(root.path().join("4242/comm"), "demo.exe\n").unwrap();

        let names = ProcfsNames::with_root(root.path());
        assert_eq!(names.name_of(4242).unwrap(), "demo.exe");
        assert_eq!(names.name_of(7), Err(ProbeError::ProcessGone(7)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn resolves_own_process() {
        let names = ProcfsNames::new();
        assert!(!names.name_of(std::process::id()).unwrap().is_empty());
    }
}
