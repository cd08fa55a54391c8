#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays one Halite III game over stdin/stdout.
//!
//! Stdout carries the engine protocol and nothing else; logs go to stderr or
//! to the file named by `--log-file`.

mod config;

use std::{fs::File, io, path::PathBuf, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use harvester_system_brain::Brain;
use harvester_world::{StdioTransport, TurnTransport};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Command-line arguments accepted by the harvester bot.
#[derive(Debug, Parser)]
#[command(
    name = "harvester",
    version,
    about = "Halite III bot that harvests, banks its cargo and runs home before the deadline"
)]
struct CliArgs {
    /// Name announced to the engine once the handshake is read.
    #[arg(long, default_value = "Vyl_harvester")]
    name: String,
    /// Seed for every random decision; drawn at random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file overriding the fleet and pilot tuning.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Writes logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

/// Entry point for the harvester bot.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(&args)?;

    let brain_config = config::load(args.config.as_deref())?;
    let seed = args.seed.unwrap_or_else(rand::random);

    let (mut transport, mut game) = StdioTransport::connect(io::stdin().lock(), io::stdout().lock())
        .context("failed to read the engine handshake")?;
    let mut brain = Brain::new(&game, brain_config, ChaCha8Rng::seed_from_u64(seed));
    transport
        .ready(&args.name)
        .context("failed to announce the bot to the engine")?;
    info!(
        name = %args.name,
        player = game.my_id().get(),
        seed,
        width = game.map().width(),
        height = game.map().height(),
        halite = game.map().total_halite(),
        "bot ready"
    );

    while let Some(report) = brain
        .step(&mut transport, &mut game)
        .with_context(|| format!("turn {} failed", game.turn_number()))?
    {
        debug!(
            turn = report.turn,
            remaining = game.turns_remaining(),
            commands = report.commands.len(),
            spawned = report.spawned,
            depot_added = report.depot_added,
            endgame = report.endgame,
            "turn submitted"
        );
    }

    info!(
        turns = game.turn_number(),
        depots = brain.depots().len(),
        bank = game.me().halite,
        "game over"
    );
    Ok(())
}

fn init_logging(args: &CliArgs) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level).into())
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(io::stderr).init(),
    }
    Ok(())
}
