//! Error types for game orchestration and connection I/O

use std::time::Duration;

use minechess_core::MoveError;

/// Errors returned synchronously by [`crate::Game`] operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("game is full")]
    GameFull,

    #[error("not authorized to join this game")]
    NotAuthorized,

    #[error("player id must not be empty")]
    InvalidPlayerId,

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failure writing to a single connection
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("send failed: {0}")]
    Send(String),
}
