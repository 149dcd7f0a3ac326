//! Shared helpers used by multiple backend implementations.

use std::io::Read;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use crate::error::ProbeError;

/// Default bound on a single subprocess call.
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(400);

// ---------------------------------------------------------------------------
// Subprocess
// ---------------------------------------------------------------------------

/// Run a command and return its trimmed stdout.
///
/// The child is polled until it exits or `timeout` elapses; on expiry it is
/// killed and reaped, and the call fails with [`ProbeError::Timeout`].
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String, ProbeError> {
    let mut child = std::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProbeError::NotFound(program.to_string()),
            _ => ProbeError::CommandFailed {
                program: program.to_string(),
                reason: e.to_string(),
            },
        })?;

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return Err(ProbeError::CommandFailed {
                        program: program.to_string(),
                        reason: status.to_string(),
                    });
                }
                let mut out = Vec::new();
                if let Some(mut stdout) = child.stdout.take() {
                    stdout.read_to_end(&mut out)?;
                }
                return Ok(String::from_utf8_lossy(&out).trim().to_string());
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProbeError::Timeout {
                        program: program.to_string(),
                        after: timeout,
                    });
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// sysfs / procfs
// ---------------------------------------------------------------------------

/// Read a file and trim it; `None` if unreadable or empty.
pub fn read_trimmed(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let v = raw.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Lowercase a sensor label and collapse runs of non-alphanumerics to `_`.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_us = false;
    for ch in raw.to_ascii_lowercase().chars() {
        let mapped = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if mapped == '_' {
            if !prev_us {
                out.push(mapped);
            }
            prev_us = true;
        } else {
            out.push(mapped);
            prev_us = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Truncate a percentage to an integer in `0..=100`.
pub fn clamp_percent(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_collapses_separators() {
        assert_eq!(normalize_key("Package id 0"), "package_id_0");
        assert_eq!(normalize_key("  Tctl  "), "tctl");
        assert_eq!(normalize_key("Core--1"), "core_1");
    }

    #[test]
    fn clamp_percent_truncates_and_bounds() {
        assert_eq!(clamp_percent(42.9), 42);
        assert_eq!(clamp_percent(-3.0), 0);
        assert_eq!(clamp_percent(130.0), 100);
        assert_eq!(clamp_percent(f64::NAN), 0);
    }

    #[test]
    fn read_trimmed_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        let full = dir.path().join("full");
        std::fs::write(&empty, "  \n").unwrap();
        std::fs::write(&full, "coretemp\n").unwrap();
        assert_eq!(read_trimmed(&empty), None);
        assert_eq!(read_trimmed(&full).as_deref(), Some("coretemp"));
        assert_eq!(read_trimmed(&dir.path().join("missing")), None);
    }

    #[test]
    fn missing_program_is_not_found() {
        let err = run_command("rigwatch-no-such-binary", &[], COMMAND_TIMEOUT).unwrap_err();
        assert_eq!(err, ProbeError::NotFound("rigwatch-no-such-binary".into()));
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_trimmed() {
        let out = run_command("echo", &["  hello  "], COMMAND_TIMEOUT).unwrap();
        assert_eq!(out, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_command_failure() {
        let err = run_command("false", &[], COMMAND_TIMEOUT).unwrap_err();
        assert!(matches!(err, ProbeError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_is_killed() {
        let start = Instant::now();
        let err = run_command("sleep", &["5"], Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
