//! NVIDIA GPUs via the `nvidia-smi` command-line tool.
//!
//! Every call is a bounded subprocess; a wedged driver surfaces as
//! [`ProbeError::Timeout`] for that query.

use std::sync::Arc;
use std::time::Duration;

use super::gpu::{GpuDevice, GpuLink};
use super::helpers::run_command;
use crate::error::ProbeError;
use crate::process::GpuProcess;

const NVIDIA_SMI: &str = "nvidia-smi";
const MIB: u64 = 1024 * 1024;

/// One GPU as seen by `nvidia-smi`.
#[derive(Debug, Clone)]
pub struct NvidiaSmi {
    index: u32,
    name: String,
    timeout: Duration,
}

impl NvidiaSmi {
    /// Open GPU `index`. Fails if the tool is missing or the index does not
    /// exist.
    pub fn open(index: u32, timeout: Duration) -> Result<Self, ProbeError> {
        let mut smi = Self {
            index,
            name: String::new(),
            timeout,
        };
        let raw = smi.query_gpu("name")?;
        smi.name = first_line(&raw, "gpu name")?.to_string();
        log::info!("opened GPU {index}: {}", smi.name);
        Ok(smi)
    }

    /// Open GPU `index` as a shareable link.
    pub fn link(index: u32, timeout: Duration) -> GpuLink {
        Self::open(index, timeout).map(|smi| Arc::new(smi) as Arc<dyn GpuDevice>)
    }

    fn run(&self, query: &str) -> Result<String, ProbeError> {
        let id = self.index.to_string();
        run_command(
            NVIDIA_SMI,
            &[query, "--format=csv,noheader,nounits", "-i", &id],
            self.timeout,
        )
    }

    fn query_gpu(&self, field: &str) -> Result<String, ProbeError> {
        self.run(&format!("--query-gpu={field}"))
    }
}

impl GpuDevice for NvidiaSmi {
    fn name(&self) -> &str {
        &self.name
    }

    fn utilization(&self) -> Result<u32, ProbeError> {
        let raw = self.query_gpu("utilization.gpu")?;
        parse_number(&raw, "gpu utilization")
    }

    fn temperature(&self) -> Result<i32, ProbeError> {
        let raw = self.query_gpu("temperature.gpu")?;
        parse_number(&raw, "gpu temperature")
    }

    fn processes(&self) -> Result<Vec<GpuProcess>, ProbeError> {
        // `--query-compute-apps` omits graphics contexts; the PIDS report
        // lists both.
        let id = self.index.to_string();
        let raw = run_command(NVIDIA_SMI, &["-q", "-x", "-d", "PIDS", "-i", &id], self.timeout)?;
        parse_pids_report(&raw)
    }
}

fn first_line<'a>(raw: &'a str, what: &'static str) -> Result<&'a str, ProbeError> {
    raw.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ProbeError::Parse {
            what,
            raw: raw.to_string(),
        })
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &'static str) -> Result<T, ProbeError> {
    first_line(raw, what)?
        .parse()
        .map_err(|_| ProbeError::Parse {
            what,
            raw: raw.to_string(),
        })
}

/// Text between `<tag>` and `</tag>`, searching from the start of `block`.
fn element<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = block.find(&open)? + open.len();
    let len = block[start..].find(&close)?;
    Some(block[start..start + len].trim())
}

/// Parse the `<process_info>` entries of `nvidia-smi -q -x -d PIDS`.
///
/// Memory is reported as e.g. `512 MiB`; `N/A` counts as zero usage.
fn parse_pids_report(raw: &str) -> Result<Vec<GpuProcess>, ProbeError> {
    if !raw.contains("<nvidia_smi_log") {
        return Err(ProbeError::Parse {
            what: "gpu process report",
            raw: raw.to_string(),
        });
    }
    let mut out = Vec::new();
    for block in raw.split("<process_info>").skip(1) {
        let block = block.split_once("</process_info>").map_or(block, |(b, _)| b);
        let pid = element(block, "pid")
            .and_then(|f| f.parse::<u32>().ok())
            .ok_or_else(|| ProbeError::Parse {
                what: "gpu process pid",
                raw: block.trim().to_string(),
            })?;
        let mib = element(block, "used_memory")
            .and_then(|f| f.trim_end_matches("MiB").trim().parse::<u64>().ok())
            .unwrap_or(0);
        out.push(GpuProcess {
            pid,
            used_memory: mib * MIB,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_queries() {
        assert_eq!(parse_number::<u32>("37\n", "x").unwrap(), 37);
        assert_eq!(parse_number::<i32>("  64 \n", "x").unwrap(), 64);
        assert!(matches!(
            parse_number::<u32>("[N/A]", "gpu utilization"),
            Err(ProbeError::Parse { what: "gpu utilization", .. })
        ));
        assert!(parse_number::<u32>("", "x").is_err());
    }

    fn report(entries: &[(&str, &str, &str)]) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" ?>\n<nvidia_smi_log>\n<gpu id=\"00000000:01:00.0\">\n<processes>\n",
        );
        for (pid, kind, mem) in entries {
            xml.push_str(&format!(
                "<process_info>\n<gpu_instance_id>N/A</gpu_instance_id>\n\
                 <pid>{pid}</pid>\n<type>{kind}</type>\n\
                 <process_name>/usr/bin/app</process_name>\n\
                 <used_memory>{mem}</used_memory>\n</process_info>\n"
            ));
        }
        xml.push_str("</processes>\n</gpu>\n</nvidia_smi_log>\n");
        xml
    }

    #[test]
    fn graphics_and_compute_processes_are_listed() {
        let raw = report(&[
            ("1234", "G", "512 MiB"),
            ("5678", "C", "2048 MiB"),
            ("91", "C+G", "64 MiB"),
        ]);
        let procs = parse_pids_report(&raw).unwrap();
        assert_eq!(
            procs,
            vec![
                GpuProcess {
                    pid: 1234,
                    used_memory: 512 * MIB
                },
                GpuProcess {
                    pid: 5678,
                    used_memory: 2048 * MIB
                },
                GpuProcess {
                    pid: 91,
                    used_memory: 64 * MIB
                },
            ]
        );
    }

    #[test]
    fn no_processes_is_empty_list() {
        let raw = report(&[]);
        assert!(parse_pids_report(&raw).unwrap().is_empty());
        let none = "<nvidia_smi_log><gpu><processes>\n</processes></gpu></nvidia_smi_log>";
        assert!(parse_pids_report(none).unwrap().is_empty());
    }

    #[test]
    fn unreported_memory_counts_as_zero() {
        let procs = parse_pids_report(&report(&[("99", "G", "N/A")])).unwrap();
        assert_eq!(procs[0].used_memory, 0);
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(parse_pids_report("No devices were found").is_err());
        let bad = report(&[("not-a-pid", "G", "1 MiB")]);
        assert!(parse_pids_report(&bad).is_err());
    }

    #[test]
    #[ignore] // Requires an NVIDIA GPU and driver
    fn open_real_gpu() {
        let smi = NvidiaSmi::open(0, Duration::from_secs(2)).unwrap();
        assert!(!smi.name().is_empty());
        assert!(smi.utilization().unwrap() <= 100);
    }
}
