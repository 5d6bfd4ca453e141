//! Skirmish harness
//!
//! Plays two AI controllers against each other and prints a JSON summary.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use rts_ai::{AiConfig, Difficulty, Personality};
use rts_sim::{bundled_rules, run_match, MatchConfig, SimError};
use rts_world::{House, MapDimensions, RulesCatalog};

/// Command line arguments for the harness
#[derive(Parser, Debug)]
#[command(name = "rts-sim")]
#[command(about = "Headless AI-versus-AI skirmish")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Maximum number of ticks to simulate (30 per second)
    #[arg(long, default_value_t = 6000)]
    ticks: u64,

    /// easy, normal or hard
    #[arg(long, default_value = "normal")]
    difficulty: Difficulty,

    /// Personality preset for both controllers
    #[arg(long, default_value = "balanced")]
    personality: String,

    /// AI configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rules catalog (JSON); the bundled one by default
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Square map edge length in world units
    #[arg(long, default_value_t = 4096.0)]
    map_size: f32,

    /// Houses for player 1 and player 2
    #[arg(long, num_args = 2, default_values_t = [House::Atreides, House::Harkonnen])]
    houses: Vec<House>,

    /// Write the summary here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), SimError> {
    let ai = match &args.config {
        Some(path) => AiConfig::from_file(path)?,
        None => AiConfig::default(),
    };
    let rules = match &args.rules {
        Some(path) => RulesCatalog::from_file(path)?,
        None => bundled_rules()?,
    };
    let houses = match args.houses.as_slice() {
        [a, b] => [*a, *b],
        _ => [House::Atreides, House::Harkonnen],
    };

    let config = MatchConfig {
        seed: args.seed,
        ticks: args.ticks,
        map: MapDimensions::new(args.map_size, args.map_size),
        houses,
        difficulty: args.difficulty,
        personality: Personality::preset(&args.personality)?,
        ai,
        ..MatchConfig::default()
    };
    tracing::info!(
        "Seed {}, {} ticks, {:?}, {} vs {}",
        config.seed,
        config.ticks,
        config.difficulty,
        houses[0],
        houses[1]
    );

    let summary = run_match(config, rules)?;
    match &args.output {
        Some(path) => {
            summary.write_to(path)?;
            tracing::info!("Summary written to {}", path.display());
        }
        None => println!("{}", summary.to_json()?),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
