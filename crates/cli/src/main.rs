//! giftbot CLI — the main entry point.
//!
//! Commands:
//! - `run`      — Restore games and serve the configured channel
//! - `status`   — Summarize the game snapshot without starting the bot
//! - `onboard`  — Write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use giftbot_config::{AppConfig, ConfigError};

mod commands;

#[derive(Parser)]
#[command(
    name = "giftbot",
    about = "giftbot — number-guessing giveaway bot",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.giftbot/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot until Ctrl-C
    Run,

    /// Show the persisted state of every channel
    Status {
        /// Read this snapshot instead of the configured one
        #[arg(long)]
        data_file: Option<PathBuf>,
    },

    /// Write a default configuration file
    Onboard,
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run => {
            let config = load_config(cli.config.as_ref())
                .map_err(|e| format!("Failed to load config: {e}"))?;
            commands::run::run(config).await?
        }
        Commands::Status { data_file } => {
            let config = load_config(cli.config.as_ref())
                .map_err(|e| format!("Failed to load config: {e}"))?;
            commands::status::run(&config, data_file)?
        }
        Commands::Onboard => commands::onboard::run(cli.config)?,
    }

    Ok(())
}
