//! `rigwatch monitor`: live telemetry, one line per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use rigwatch_core::{
    Aggregator, ExportRecord, MonitorConfig, RollingWindow, Snapshot, TickScheduler, export_log,
};

use super::make_aggregator;

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Sparkline of a percentage series, one glyph per sample.
fn sparkline(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| {
            let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
            let idx = ((v / 100.0) * (SPARK.len() - 1) as f64).round() as usize;
            SPARK[idx.min(SPARK.len() - 1)]
        })
        .collect()
}

struct MonitorState {
    agg: Aggregator,
    cpu_history: RollingWindow,
    last: Option<Snapshot>,
}

impl MonitorState {
    fn step(&mut self) -> String {
        let snap = self.agg.tick();
        self.cpu_history.push(f64::from(snap.cpu_load_display()));
        let line = format!(
            "[{:>5}] {snap}  {}",
            snap.tick,
            sparkline(&self.cpu_history.values())
        );
        self.last = Some(snap);
        line
    }

    fn limit_reached(&self, count: Option<u64>) -> bool {
        count.is_some_and(|n| self.agg.tick_count() >= n)
    }

    /// One tick, unless `count` ticks have already run.
    fn step_within(&mut self, count: Option<u64>) -> Option<String> {
        if self.limit_reached(count) {
            return None;
        }
        Some(self.step())
    }
}

pub fn run(config: MonitorConfig, count: Option<u64>, export: bool) {
    let state = Arc::new(Mutex::new(MonitorState {
        agg: make_aggregator(&config),
        cpu_history: RollingWindow::new(config.window_capacity),
        last: None,
    }));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: could not install Ctrl+C handler: {e}");
    }

    println!(
        "Monitoring every {}ms{} (Ctrl+C to stop)",
        config.period_ms,
        if config.background_probes {
            ", background probes"
        } else {
            ""
        }
    );

    let s = state.clone();
    let done = running.clone();
    let mut scheduler = match TickScheduler::start(config.period(), move || {
        let mut st = s.lock().unwrap_or_else(PoisonError::into_inner);
        // The main loop only polls the flag, so extra ticks can fire first.
        if let Some(line) = st.step_within(count) {
            println!("{line}");
        }
        if st.limit_reached(count) {
            done.store(false, Ordering::SeqCst);
        }
    }) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error starting tick scheduler: {e}");
            std::process::exit(1);
        }
    };

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(20));
    }
    scheduler.stop();

    if scheduler.skipped() > 0 {
        log::warn!("{} tick(s) skipped: probes slower than the period", scheduler.skipped());
    }

    let st = state.lock().unwrap_or_else(PoisonError::into_inner);
    println!(
        "\n{} tick(s) at {}ms",
        st.agg.tick_count(),
        scheduler.period().as_millis()
    );

    if export {
        let Some(snap) = &st.last else {
            eprintln!("No snapshot taken; nothing to export.");
            return;
        };
        let record = ExportRecord::at_capture(snap);
        match export_log(&config.export_dir, &[record], SystemTime::now()) {
            Ok(path) => println!("Saved {}", path.display()),
            Err(e) => {
                eprintln!("Failed to write log: {e}");
                std::process::exit(1);
            }
        }
    }
}
