//! MineChess CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the multiplayer server
//! - play: Replay a line of coordinate moves through the engine

mod play;
mod server;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minechess")]
#[command(about = "MineChess multiplayer chess server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve(server::ServerArgs),
    /// Replay moves from the starting position and print the result
    Play(play::PlayArgs),
}

fn main() -> anyhow::Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args),
        Commands::Play(args) => play::run(args),
    }
}
