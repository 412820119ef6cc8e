//! MineChess Server - live game hosting
//!
//! This crate provides the multiplayer backend:
//! - Game aggregate with seating, move routing and terminal detection
//! - Per-game connection registry and state broadcaster
//! - REST API for creating and joining games
//! - WebSocket transport for live play
//! - Optional static file serving for the frontend

pub mod broadcast;
pub mod error;
pub mod game;
pub mod manager;
pub mod registry;
mod routes;
mod state;
mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, services::ServeDir};

pub use broadcast::{
    BroadcastReport, Broadcaster, ClientMessage, FullView, ServerMessage, ViewFilter,
    DEFAULT_WRITE_TIMEOUT,
};
pub use error::{GameError, TransportError};
pub use game::Game;
pub use manager::GameManager;
pub use registry::{Connection, ConnectionHandle, ConnectionRegistry};
pub use state::ServerState;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served for any path not matched by the API
    pub static_dir: Option<String>,
    /// Upper bound on a single WebSocket write
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let router = Router::new()
        // Status endpoint
        .route("/api/status", get(routes::status::status_handler))
        // Game API
        .route("/api/game/create", post(routes::game::create_game))
        .route("/api/game/join/{game_id}", post(routes::game::join_game))
        .route("/api/game/{game_id}", get(routes::game::get_game))
        .route(
            "/api/game/{game_id}/moves/{square}",
            get(routes::game::legal_moves),
        )
        // Live play
        .route("/ws/game/{game_id}", get(ws::game_socket))
        // Shared state
        .with_state(state);

    // Static file serving (must be last)
    let router = match &config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(CorsLayer::permissive())
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(ServerState::with_write_timeout(config.write_timeout));
    let router = create_router(&config, state);

    tracing::info!("MineChess server starting on http://0.0.0.0:{}", config.port);
    match &config.static_dir {
        Some(dir) => tracing::info!("Static files served from: {}", dir),
        None => tracing::info!("Static file serving disabled"),
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
