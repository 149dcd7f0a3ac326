//! CSV export of snapshots.
//!
//! A log file is a header row followed by one row per record:
//!
//! ```text
//! Time,CPU,GPU,GPU Temp,FPS,Game
//! 14:25:03,42,10,55,60,demo.exe
//! ```

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::clock::{ClockTime, LocalTime};
use crate::snapshot::Snapshot;

pub const EXPORT_HEADER: &str = "Time,CPU,GPU,GPU Temp,FPS,Game";

/// One exported row. Absent readings are already collapsed to `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub time: ClockTime,
    pub cpu: u32,
    pub gpu: u32,
    pub gpu_temp: i32,
    pub fps: u32,
    pub game: String,
}

impl ExportRecord {
    pub fn from_snapshot(snapshot: &Snapshot, time: ClockTime) -> Self {
        Self {
            time,
            cpu: snapshot.cpu_load_display(),
            gpu: snapshot.gpu_load_display(),
            gpu_temp: snapshot.gpu_temp_display(),
            fps: snapshot.fps,
            game: snapshot.process.to_string(),
        }
    }

    /// Stamp with the snapshot's own capture time in local time.
    pub fn at_capture(snapshot: &Snapshot) -> Self {
        Self::from_snapshot(snapshot, ClockTime::local(snapshot.taken_at_time()))
    }

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.time,
            self.cpu,
            self.gpu,
            self.gpu_temp,
            self.fps,
            csv_field(&self.game)
        )
    }
}

/// Quote a field only if it contains a separator, quote or line break.
fn csv_field(raw: &str) -> Cow<'_, str> {
    if raw.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", raw.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Write the header and every record.
pub fn write_csv<W: Write>(mut w: W, records: &[ExportRecord]) -> std::io::Result<()> {
    writeln!(w, "{EXPORT_HEADER}")?;
    for r in records {
        writeln!(w, "{}", r.to_csv_row())?;
    }
    w.flush()
}

/// Write `log_YYYYMMDD_HHMMSS.csv` under `dir` and return its path.
pub fn export_log(dir: &Path, records: &[ExportRecord], now: SystemTime) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = LocalTime::from_system(now).file_stamp();
    let path = dir.join(format!("log_{stamp}.csv"));
    let file = File::create(&path)?;
    write_csv(BufWriter::new(file), records)?;
    log::info!("exported {} record(s) to {}", records.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Reading;
    use crate::process::ConsumerProcess;

    fn record(game: &str) -> ExportRecord {
        ExportRecord {
            time: ClockTime::new(14, 25, 3),
            cpu: 42,
            gpu: 10,
            gpu_temp: 55,
            fps: 60,
            game: game.to_string(),
        }
    }

    #[test]
    fn plain_row() {
        assert_eq!(record("demo.exe").to_csv_row(), "14:25:03,42,10,55,60,demo.exe");
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_field("Idle"), "Idle");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn sentinels_from_snapshot() {
        let snap = Snapshot {
            tick: 1,
            taken_at: 0,
            cpu_load: Reading::Ok(12),
            cpu_temp: Reading::Ok(70),
            gpu_load: Reading::Unavailable,
            gpu_temp: Reading::Unavailable,
            fps: 1,
            process: ConsumerProcess::NotAvailable,
        };
        let r = ExportRecord::from_snapshot(&snap, ClockTime::new(0, 0, 1));
        assert_eq!(r.to_csv_row(), "00:00:01,12,0,0,1,N/A");
    }

    #[test]
    fn write_csv_emits_header_first() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[record("a"), record("b")]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], EXPORT_HEADER);
        assert!(lines[2].ends_with(",b"));
    }

    #[test]
    fn export_log_names_file_by_time() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let path = export_log(dir.path(), &[record("demo.exe")], now).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let expected = format!("log_{}.csv", LocalTime::from_system(now).file_stamp());
        assert_eq!(name, expected);
        assert_eq!(name.len(), "log_YYYYMMDD_HHMMSS.csv".len());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{EXPORT_HEADER}\n14:25:03,42,10,55,60,demo.exe\n"));
    }

    #[test]
    fn export_log_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs/today");
        let path = export_log(&nested, &[], SystemTime::now()).unwrap();
        assert!(path.starts_with(&nested));
        assert_eq!(std::fs::read_to_string(path).unwrap(), format!("{EXPORT_HEADER}\n"));
    }
}
