//! Command-line interface for codemaster.

use clap::{Parser, Subcommand};

/// Codemaster - multiplayer code-breaking game
#[derive(Parser, Debug)]
#[command(name = "codemaster")]
#[command(about = "Multiplayer code-breaking game server and client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Game rules file (TOML). Defaults apply when omitted.
        #[arg(short, long, env = "CODEMASTER_CONFIG")]
        config: Option<std::path::PathBuf>,

        /// Override the directory finished games are archived into
        #[arg(long)]
        archive_dir: Option<std::path::PathBuf>,
    },

    /// Play in the terminal against a running server
    Play {
        /// Game server URL
        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,
    },
}
