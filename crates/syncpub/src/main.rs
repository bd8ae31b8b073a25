//! syncpub CLI - multi-workspace replication gateway.
//!
//! Provides commands for:
//! - `serve`: Start the sync gateway

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use syncpub_config::LogConfig;
use tracing_subscriber::EnvFilter;

use commands::ServeArgs;
use output::Output;

/// syncpub - host many workspaces and let peers sync them.
#[derive(Parser)]
#[command(name = "syncpub", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the sync gateway.
    Serve(ServeArgs),
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured log level decides.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.filter_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let result = match cli.command {
        Commands::Serve(args) => args.load_config().and_then(|config| {
            init_tracing(&config.log);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(commands::serve::run(config))
        }),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
