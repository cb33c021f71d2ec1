//! icetun CLI
//!
//! Command-line interface for the icetun peer-to-peer tunnel.

mod cli;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Execute command; every unrecoverable error lands here.
    let result = match cli.command {
        Commands::Offer(args) => cli::offer::run(args, cli.config).await,
        Commands::Answer(args) => cli::answer::run(args, cli.config).await,
    };

    if let Err(err) = result {
        error!("session failed: {err:#}");
        std::process::exit(1);
    }
}
