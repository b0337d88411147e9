//! Tessel Runtime
//!
//! Headless driver: spawns bodies across several maps, moves them every tick
//! and runs grid sync, broad phase and nearby queries against them.

mod sim;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tessel_core::SpatialSettings;
use tracing_subscriber::EnvFilter;

/// Run a seeded spatial partitioning simulation
#[derive(Parser, Debug)]
#[command(name = "tessel")]
#[command(version, about)]
struct Args {
    /// JSON settings file; defaults are used when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Bodies to spawn
    #[arg(long, default_value_t = 2_000)]
    entities: u32,

    /// Maps to spread the bodies over
    #[arg(long, default_value_t = 2)]
    maps: u16,

    /// Ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Seed for body placement and movement
    #[arg(long, default_value_t = 0x7E55E1)]
    seed: u64,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_settings: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Tessel v{}", tessel_core::VERSION);

    let settings = match &args.settings {
        Some(path) => SpatialSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => SpatialSettings::default(),
    };
    settings.validate().context("invalid settings")?;

    if args.print_settings {
        println!("{}", settings.to_json_pretty()?);
        return Ok(());
    }

    let options = sim::SimOptions {
        entities: args.entities,
        maps: args.maps.max(1),
        seed: args.seed,
    };
    let mut simulation = sim::Simulation::new(&settings, options).context("starting simulation")?;
    let summary = simulation.run(args.ticks);

    tracing::info!(
        ticks = summary.ticks,
        pairs = summary.total_pairs,
        rejected = summary.rejected,
        tps = summary.ticks_per_second,
        "simulation finished"
    );
    Ok(())
}
