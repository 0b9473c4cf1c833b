use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use logistics_sim::simulation::{SaveData, SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "logistics_sim")]
#[command(about = "Headless logistics simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "600")]
    ticks: u32,

    /// Time delta per tick in milliseconds
    #[arg(long, default_value = "100")]
    delta: f64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with simulation parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start from a saved state instead of the demo network
    #[arg(long)]
    import: Option<PathBuf>,

    /// Write the final state to this file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print a summary every N ticks (0 = only at the end)
    #[arg(long, default_value = "0")]
    summary_every: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation without any renderer
fn run_headless(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    let mut world = SimWorld::with_config(config, cli.seed);
    match &cli.import {
        Some(path) => {
            let data = SaveData::load_from_file(path)
                .with_context(|| format!("Failed to import state from {}", path.display()))?;
            world.import_state(data);
        }
        None => world = SimWorld::build_demo_world(world),
    }

    info!(
        "Running {} ticks of {}ms ({:.1}s simulated)",
        cli.ticks,
        cli.delta,
        cli.ticks as f64 * cli.delta / 1000.0
    );
    println!("Initial state:");
    world.print_summary();
    println!();

    for tick in 1..=cli.ticks {
        world.tick(cli.delta);
        // Outbox is only for embedders; nothing reads it here
        world.drain_events();

        if cli.summary_every > 0 && tick % cli.summary_every == 0 && tick < cli.ticks {
            println!("--- After tick {} ({:.1}s simulated time) ---", tick, world.now_ms() / 1000.0);
            world.print_summary();
            println!();
        }
    }

    let economy = &world.state().economy;
    info!("=== SIMULATION COMPLETE ===");
    info!("Money: ${:.0}", economy.money);
    info!("Deliveries completed: {}", economy.deliveries_completed);
    info!("Clients served: {}", economy.clients_served);
    info!("Clients abandoned: {}", economy.clients_abandoned);
    info!("Service rate: {:.1}%", economy.service_rate());
    info!("Units discarded: {}", economy.units_discarded);
    info!("Total nodes: {}", world.state().nodes.len());
    info!("Total vehicles: {}", world.state().vehicles.len());
    println!("=== Final State ===");
    world.print_summary();

    if let Some(path) = &cli.export {
        world
            .export_state()
            .save_to_file(path)
            .with_context(|| format!("Failed to export state to {}", path.display()))?;
        info!("State written to {}", path.display());
    }

    Ok(())
}
