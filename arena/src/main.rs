use std::path::PathBuf;

use arena::{Arena, ArenaConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;

/// Runs a swarm of aggregation controllers in a kinematic arena.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Arena configuration file (YAML), defaults are used if absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 1000)]
    ticks: u64,

    /// Log statistics every this many ticks
    #[arg(short, long, default_value_t = 100)]
    report_every: u64,
}

fn main() -> anyhow::Result<()> {
    // Log to stdout (if you run with `RUST_LOG=debug`).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let args = Args::parse();

    // load configuration file
    let config = match &args.config {
        Some(path) => ArenaConfig::from_file(path)?,
        None => ArenaConfig::default(),
    };

    let mut arena = Arena::new(config)?;

    let report_every = args.report_every.max(1);
    for _ in 0..args.ticks {
        let stats = arena.tick();
        if stats.tick % report_every == 0 {
            info!(
                tick = stats.tick,
                exchanged = stats.exchanged,
                telemetry = arena.telemetry_count(),
                "mean pairwise distance {:.2}",
                stats.mean_pairwise_distance
            );
        }
    }

    Ok(())
}
