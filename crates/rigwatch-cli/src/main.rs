//! CLI for rigwatch: sample CPU/GPU telemetry on a fixed cadence.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rigwatch")]
#[command(about = "rigwatch: fault-tolerant CPU/GPU telemetry sampler")]
#[command(version = rigwatch_core::VERSION)]
struct Cli {
    /// JSON config file (period_ms, window_capacity, gpu_index, ...)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize every probe and list which sources are available
    Scan {
        /// Print the probe report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take one snapshot (two ticks one period apart, prints the second)
    Snapshot {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sample continuously, one line per tick, until Ctrl+C
    Monitor {
        /// Tick period in seconds (overrides the config file)
        #[arg(long)]
        refresh: Option<f64>,

        /// Stop after this many ticks
        #[arg(long)]
        count: Option<u64>,

        /// Write the last snapshot as a CSV log on exit
        #[arg(long)]
        export: bool,

        /// Run sensor and GPU queries on background threads
        #[arg(long)]
        background: bool,
    },

    /// Capture a snapshot and write it as a CSV log
    Export {
        /// Output directory (default: config export_dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Scan { json } => commands::scan::run(&config, json),
        Commands::Snapshot { json } => commands::snapshot::run(&config, json),
        Commands::Monitor {
            refresh,
            count,
            export,
            background,
        } => commands::monitor::run(
            commands::with_overrides(config, refresh, background),
            count,
            export,
        ),
        Commands::Export { output } => commands::export::run(&config, output.as_deref()),
    }
}
