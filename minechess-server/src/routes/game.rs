//! Game API routes: create, join, inspect

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use minechess_core::{Color, GameState, Position};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::game::Game;
use crate::state::ServerState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    pub game_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    pub player_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponse {
    pub game_id: String,
    pub color: Color,
}

#[derive(Serialize)]
pub struct LegalMovesResponse {
    pub from: Position,
    pub moves: Vec<Position>,
}

fn find_game(state: &ServerState, game_id: &str) -> Result<Arc<Game>, ApiError> {
    state
        .games
        .get(game_id)
        .ok_or_else(|| ApiError::GameNotFound(game_id.to_string()))
}

/// POST /api/game/create
pub async fn create_game(State(state): State<Arc<ServerState>>) -> Json<CreateGameResponse> {
    let game = state.games.create_game();
    Json(CreateGameResponse {
        game_id: game.id().to_string(),
    })
}

/// POST /api/game/join/{gameId}
pub async fn join_game(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<String>,
    Json(request): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, ApiError> {
    let game = find_game(&state, &game_id)?;
    let color = game.add_player(&request.player_id)?;
    Ok(Json(JoinGameResponse { game_id, color }))
}

/// GET /api/game/{gameId}
pub async fn get_game(
    State(state): State<Arc<ServerState>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameState>, ApiError> {
    let game = find_game(&state, &game_id)?;
    Ok(Json(game.get_state()))
}

/// GET /api/game/{gameId}/moves/{square}
pub async fn legal_moves(
    State(state): State<Arc<ServerState>>,
    Path((game_id, square)): Path<(String, String)>,
) -> Result<Json<LegalMovesResponse>, ApiError> {
    let game = find_game(&state, &game_id)?;
    let from = Position::from_square(&square).ok_or(ApiError::InvalidSquare(square))?;
    Ok(Json(LegalMovesResponse {
        from,
        moves: game.legal_moves_from(from),
    }))
}
