use rigwatch_core::{MonitorConfig, ProbeStatus};

use super::make_aggregator;

pub fn run(config: &MonitorConfig, json: bool) {
    let agg = make_aggregator(config);
    let report = agg.probe_report();

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let available = report
        .iter()
        .filter(|s| s.availability.is_available())
        .count();
    println!("rigwatch {}", rigwatch_core::VERSION);
    println!("Found {available}/{} telemetry source(s):\n", report.len());
    for status in &report {
        println!("{}", format_status(status));
    }
}

fn format_status(status: &ProbeStatus) -> String {
    let mark = if status.availability.is_available() {
        "\u{2705}"
    } else {
        "\u{274C}"
    };
    format!("  {mark} {:<12} {}", status.kind.to_string(), status.availability)
}
