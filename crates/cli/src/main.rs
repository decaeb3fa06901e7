//! logtail CLI - follow log files with coalesced change notifications

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;
mod logging;

/// logtail - Low-rate change notifications for fast-growing log files
#[derive(Parser)]
#[command(name = "logtail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print coalesced change events for a log file until Ctrl-C
    Follow {
        /// Log file to follow (may not exist yet)
        file: PathBuf,

        /// Minimum spacing between forwarded writes (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    let _log_guard = logging::init(&config.log)?;

    match cli.command {
        Commands::Follow {
            file,
            debounce_ms,
            json,
        } => {
            if let Some(ms) = debounce_ms {
                config.dedup.debounce_ms = ms;
            }
            cmd::follow::run(&file, &config.dedup, json).await
        }
    }
}
