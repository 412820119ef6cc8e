//! Example to run the MineChess server standalone
//!
//! Run with: cargo run -p minechess-server --example run_server [static_dir]

use minechess_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ServerConfig {
        static_dir: std::env::args().nth(1),
        ..ServerConfig::default()
    };

    println!("Starting MineChess server on port {}", config.port);
    println!("Create a game: curl -X POST http://localhost:{}/api/game/create", config.port);

    run_server(config).await
}
