use std::path::Path;
use std::time::SystemTime;

use rigwatch_core::{ExportRecord, MonitorConfig, export_log};

use super::{make_aggregator, settled_snapshot};

pub fn run(config: &MonitorConfig, output: Option<&Path>) {
    let mut agg = make_aggregator(config);
    let snap = settled_snapshot(&mut agg, config);
    let dir = output.unwrap_or(config.export_dir.as_path());

    match export_log(dir, &[ExportRecord::at_capture(&snap)], SystemTime::now()) {
        Ok(path) => println!("Saved {}", path.display()),
        Err(e) => {
            eprintln!("Failed to write log in {}: {e}", dir.display());
            std::process::exit(1);
        }
    }
}
