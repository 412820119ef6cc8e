//! HTTP route handlers

pub mod game;
pub mod status;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::GameError;

/// Errors surfaced to HTTP clients as `{ "error": .. }`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("game not found: {0}")]
    GameNotFound(String),

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::GameNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidSquare(_) => StatusCode::BAD_REQUEST,
            ApiError::Game(GameError::GameFull) => StatusCode::CONFLICT,
            ApiError::Game(GameError::NotAuthorized) => StatusCode::FORBIDDEN,
            ApiError::Game(GameError::InvalidPlayerId) => StatusCode::BAD_REQUEST,
            ApiError::Game(GameError::Move(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Game(GameError::Transport(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
