//! Mysa CLI, the main entry point.
//!
//! Commands:
//! - `chat`     Interactive conversation with the guide
//! - `ask`      Single question, single answer
//! - `context`  Show which grounding document is in use
//! - `doctor`   Diagnose configuration and credentials

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mysa_core::ConversationMode;

mod app;
mod commands;
mod session;

#[derive(Parser)]
#[command(
    name = "mysa",
    about = "Mysa, a local city guide in your terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.mysa/config.toml
    #[arg(short, long, global = true, env = "MYSA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with Mysa interactively
    Chat {
        /// Mode to start in (food, festival, walks)
        #[arg(short, long, default_value = "food")]
        mode: ConversationMode,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        message: String,

        /// Mode to answer in (food, festival, walks)
        #[arg(short, long, default_value = "food")]
        mode: ConversationMode,
    },

    /// Load the grounding document and report on it
    Context,

    /// Diagnose configuration and credentials
    Doctor,
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
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(mysa_config::AppConfig::config_path);

    match cli.command {
        Commands::Chat { mode } => commands::chat::run(&config_path, mode).await?,
        Commands::Ask { message, mode } => commands::ask::run(&config_path, &message, mode).await?,
        Commands::Context => commands::context::run(&config_path).await?,
        Commands::Doctor => commands::doctor::run(&config_path).await?,
    }

    Ok(())
}
