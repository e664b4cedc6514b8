//! medvote daemon: replays scripted calls against the round state machine.

mod script;

use anyhow::{bail, Context};
use clap::Parser;
use medvote_nullables::NullClock;
use medvote_rounds::{RoundManager, RoundsConfig};
use medvote_types::Clock;
use medvote_utils::{describe_window, LogFormat};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "medvote-daemon", about = "Median-elimination voting rounds")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "MEDVOTE_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "MEDVOTE_LOG_FORMAT")]
    log_format: LogFormat,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay a JSON call script and print every event as a JSON line.
    Replay {
        /// Path to the TOML round configuration.
        #[arg(long, env = "MEDVOTE_CONFIG")]
        config: PathBuf,

        /// Path to the JSON script.
        #[arg(long)]
        script: PathBuf,

        /// Clock reading (Unix seconds) when the replay begins.
        #[arg(long, default_value_t = 0)]
        start_time: u64,

        /// Write a bincode snapshot of the final state here.
        #[arg(long)]
        state_out: Option<PathBuf>,
    },
    /// Validate a configuration file and print the effective settings.
    CheckConfig {
        #[arg(long, env = "MEDVOTE_CONFIG")]
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> anyhow::Result<RoundsConfig> {
    let config = RoundsConfig::from_toml_file(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    tracing::info!(
        "Loaded config from {}: {}",
        path.display(),
        describe_window(config.round_delay_secs, config.round_duration_secs),
    );
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    medvote_utils::init_tracing(cli.log_format, &cli.log_level);

    match cli.command {
        Command::CheckConfig { config } => {
            let config = load_config(&config)?;
            print!("{}", config.to_toml_string()?);
        }
        Command::Replay {
            config,
            script,
            start_time,
            state_out,
        } => {
            let config = load_config(&config)?;
            let contents = std::fs::read_to_string(&script)
                .with_context(|| format!("reading script {}", script.display()))?;
            let steps = script::parse_script(&contents)?;

            let clock = Rc::new(NullClock::new(start_time));
            let mut manager = RoundManager::with_config(clock.clone(), config)?;
            let mut printed = 0;

            for (i, step) in steps.iter().enumerate() {
                let result = script::apply(step, &mut manager, &clock);
                for event in &manager.events()[printed..] {
                    println!("{}", serde_json::to_string(event)?);
                }
                printed = manager.events().len();
                if let Err(e) = result {
                    bail!("step {i} ({step:?}) failed: {e}");
                }
            }

            tracing::info!(
                "Replayed {} steps up to t={}: {} rounds, {} of {} candidates still eligible",
                steps.len(),
                clock.now().as_secs(),
                manager.rounds().len(),
                manager
                    .current_round_index()
                    .map_or(manager.total_registered_candidates(), |r| {
                        manager.eligible_candidates(r).len()
                    }),
                manager.total_registered_candidates(),
            );

            if let Some(path) = state_out {
                let bytes = manager.snapshot().to_bytes()?;
                std::fs::write(&path, bytes)
                    .with_context(|| format!("writing snapshot {}", path.display()))?;
                tracing::info!("Snapshot written to {}", path.display());
            }
        }
    }

    Ok(())
}
