//! Zero Trust Network simulator runner.
//!
//! # Usage
//!
//! ```bash
//! # Demo topology at 60 fps until Ctrl-C
//! ztns
//!
//! # Replay a saved layout for a minute, then save it back
//! ztns --load layout.cbor --duration-secs 60 --save layout.cbor
//!
//! # Replay the random draws of an earlier run
//! ztns --seed 1234 --duration-secs 30
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use ztns_core::SimulationConfig;
use ztns_server::{Runner, RunnerConfig};

/// Zero Trust Network simulator
#[derive(Parser, Debug)]
#[command(name = "ztns")]
#[command(about = "Headless Zero Trust Network traffic simulator")]
#[command(version)]
struct Args {
    /// Ticks per second
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Stop after this many seconds (runs until Ctrl-C when omitted)
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Seconds between metrics reports
    #[arg(long, default_value = "5")]
    report_every_secs: u64,

    /// Topology snapshot to load instead of the demo layout
    #[arg(long)]
    load: Option<PathBuf>,

    /// Save the topology snapshot here on exit
    #[arg(long)]
    save: Option<PathBuf>,

    /// Seed for the random draws (OS entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Packet progress per tick
    #[arg(long, default_value = "0.02")]
    packet_step: f64,

    /// Milliseconds between automatic packet spawns
    #[arg(long, default_value = "2000")]
    spawn_interval_ms: u64,

    /// Per-tick failure probability of a targeted component
    #[arg(long, default_value = "0.05")]
    failure_probability: f64,

    /// Probability that a spawn records a denied access
    #[arg(long, default_value = "0.1")]
    denial_probability: f64,

    /// Upper bound of the simulated response time in milliseconds
    #[arg(long, default_value = "100")]
    max_response_ms: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("ZTN simulator starting at {} fps", args.fps);

    let config = RunnerConfig {
        fps: args.fps,
        duration: args.duration_secs.map(Duration::from_secs),
        report_every: Duration::from_secs(args.report_every_secs),
        load_path: args.load,
        save_path: args.save,
        seed: args.seed,
        simulation: SimulationConfig {
            packet_step: args.packet_step,
            spawn_interval: Duration::from_millis(args.spawn_interval_ms),
            failure_probability: args.failure_probability,
            denial_probability: args.denial_probability,
            max_response_time_ms: args.max_response_ms,
        },
    };

    let runner = Runner::from_config(config)?;
    let summary = runner.run().await?;

    tracing::info!(
        "Finished after {} ticks: {} spawned, {} delivered, {} dropped, {} denied",
        summary.ticks,
        summary.spawned,
        summary.delivered,
        summary.dropped,
        summary.denied
    );
    tracing::info!("Final metrics: {}", summary.metrics);

    Ok(())
}
