//! Codemaster - unified CLI
//!
//! Runs the game server or the terminal client.

#![warn(missing_docs)]

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use codemaster::{FileArchiver, GameConfig, SessionRegistry};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            config,
            archive_dir,
        } => {
            init_tracing("info,codemaster=debug");
            run_server(host, port, config, archive_dir).await
        }
        Command::Play { server_url } => {
            // Keep the terminal readable while playing.
            init_tracing("warn");
            codemaster::play_games(server_url).await
        }
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run the HTTP game server
#[instrument]
async fn run_server(
    host: String,
    port: u16,
    config_path: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => GameConfig::from_file(path)?,
        None => {
            info!("No config file given, using default rules");
            GameConfig::default()
        }
    };
    if let Some(dir) = archive_dir {
        config = config.with_archive_dir(dir);
    }

    info!(
        code_length = config.code_length(),
        max_attempts = config.max_attempts(),
        max_players = config.max_players(),
        countdown_secs = config.countdown_secs(),
        play_secs = config.play_secs(),
        archive_dir = %config.archive_dir().display(),
        "Starting Codemaster server"
    );

    let archiver = Arc::new(FileArchiver::new(config.archive_dir()));
    let registry = SessionRegistry::new(config, archiver);
    codemaster::serve(registry, host, port).await
}
