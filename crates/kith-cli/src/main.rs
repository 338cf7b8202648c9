//! kith - suggest relationship-maintenance actions and learn from feedback.
//!
//! # Configuration
//!
//! Settings come from `--config <file>` (TOML, JSON or YAML), then from
//! these environment variables (a `.env` file is honoured):
//!
//! - `KITH_STATE_PATH` - action log location, defaults to `~/.kith/actions_log.json`
//! - `KITH_EPSILON` - exploration rate of the selector
//! - `KITH_LOW_SCORE` - relationship score floor
//! - `KITH_INACTIVITY_DAYS` - days of silence before suggesting a reach-out
//!
//! Logs go to stderr; set `RUST_LOG` to change the level.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kith_core::{EngineConfig, FeedbackOutcome, KithError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "kith")]
#[command(about = "Adaptive relationship-maintenance suggestions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (toml, json or yaml)
    #[arg(long, global = true, env = "KITH_CONFIG")]
    config: Option<PathBuf>,

    /// Action log path (overrides config and KITH_STATE_PATH)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate contacts and surface at most one action per contact
    Run {
        /// JSON array of per-contact signals
        #[arg(short, long)]
        signals: PathBuf,

        /// Exploration rate (overrides config)
        #[arg(long)]
        epsilon: Option<f64>,

        /// Seed for reproducible exploration
        #[arg(long)]
        seed: Option<u64>,

        /// Print selected actions as JSON
        #[arg(long)]
        json: bool,

        /// Record random accept/dismiss feedback for every selected action
        #[arg(long)]
        simulate_feedback: bool,
    },

    /// Record feedback for a surfaced action
    Feedback {
        /// Action id from the log
        id: u64,

        /// accepted or dismissed
        outcome: FeedbackOutcome,
    },

    /// Show learned sensitivities and acceptance counts
    Stats {
        /// Only show this contact
        #[arg(short, long)]
        contact: Option<String>,
    },

    /// Show the action log
    Log {
        /// Only show actions still waiting for feedback
        #[arg(long)]
        pending: bool,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(hint) = error_hint(&err) {
                eprintln!("Hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.state)?;

    match cli.command {
        Commands::Run {
            signals,
            epsilon,
            seed,
            json,
            simulate_feedback,
        } => commands::run(
            config,
            commands::RunOptions {
                signals,
                epsilon,
                seed,
                json,
                simulate_feedback,
            },
        ),
        Commands::Feedback { id, outcome } => commands::feedback(&config, id, outcome),
        Commands::Stats { contact } => commands::stats(&config, contact.as_deref()),
        Commands::Log { pending } => commands::log(&config, pending),
    }
}

/// Error code and suggestion of the first kith error in the chain.
fn error_hint(err: &anyhow::Error) -> Option<String> {
    let kith = err.chain().find_map(|cause| cause.downcast_ref::<KithError>())?;
    let code = kith.code().as_str();
    Some(match kith.suggestion() {
        Some(suggestion) => format!("{suggestion} ({code})"),
        None => code.to_string(),
    })
}

/// Resolve configuration: file, then environment, then `--state`.
fn load_config(path: Option<&std::path::Path>, state: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    }
    .with_env_overrides();

    if let Some(state) = state {
        config.state.path = state;
    }
    config.validate().context("invalid configuration")?;
    tracing::debug!(state = %config.state.path.display(), "Configuration loaded");
    Ok(config)
}
