#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates Nightwatch levels and runs headless
//! patrols through them.

mod config;
mod debug_view;
mod layout_transfer;
mod simulation;

use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nightwatch_world::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use crate::{
    config::CliConfig,
    debug_view::AsciiView,
    layout_transfer::LayoutSnapshot,
    simulation::{generate_map, Simulation},
};

#[derive(Debug, Parser)]
#[command(name = "nightwatch", version, about = "Stealth level generator and patrol simulator")]
struct Cli {
    /// Log debug output. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a level and print it.
    Generate {
        /// Seed for the level generator. Defaults to the current time.
        #[arg(long)]
        seed: Option<u64>,
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also print the level as a transferable layout string.
        #[arg(long)]
        export: bool,
    },
    /// Generate a level and let the player walk through its guards.
    Simulate {
        /// Seed for the level generator and agents. Defaults to the current time.
        #[arg(long)]
        seed: Option<u64>,
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Upper bound on simulated ticks of 100 ms.
        #[arg(long, default_value_t = 600)]
        ticks: u64,
        /// Print the level with every view cone after the run.
        #[arg(long)]
        show_view: bool,
    },
    /// Print a level from a layout string.
    Import {
        /// Layout string produced by `generate --export`.
        layout: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate {
            seed,
            config,
            export,
        } => {
            let config = CliConfig::load(config.as_deref())?;
            let seed = resolve_seed(seed);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut world = World::with_cell_size(config.map.cell_size);
            let map = generate_map(&config, &mut rng, &mut world)?;

            let snapshot = LayoutSnapshot::from_layout(map.layout());
            print!("{}", render_snapshot(&snapshot));
            println!("attempts: {}", map.attempts());
            if export {
                println!("{}", snapshot.encode()?);
            }
        }
        Command::Simulate {
            seed,
            config,
            ticks,
            show_view,
        } => {
            let config = CliConfig::load(config.as_deref())?;
            let seed = resolve_seed(seed);
            let mut simulation = Simulation::build(&config, seed)?;
            let report = simulation.run(ticks);
            if show_view {
                print!("{}", simulation.view());
            }
            println!("{report}");
        }
        Command::Import { layout } => {
            let snapshot =
                LayoutSnapshot::decode(&layout).context("failed to import layout string")?;
            print!("{}", render_snapshot(&snapshot));
        }
    }

    Ok(())
}

fn render_snapshot(snapshot: &LayoutSnapshot) -> String {
    AsciiView::layout(
        snapshot.columns,
        snapshot.rows,
        snapshot.start,
        &snapshot.placements,
    )
    .render()
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    let seed = seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    });
    eprintln!("seed: {seed}");
    seed
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
