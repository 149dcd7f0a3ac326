use rigwatch_core::MonitorConfig;

use super::{make_aggregator, settled_snapshot};

pub fn run(config: &MonitorConfig, json: bool) {
    let mut agg = make_aggregator(config);
    let snap = settled_snapshot(&mut agg, config);

    if json {
        match serde_json::to_string_pretty(&snap) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("{snap}");
    }
}
