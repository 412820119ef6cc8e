//! WebSocket transport for game connections
//!
//! The outbound half of each socket is registered with the game as a
//! [`Connection`]; the inbound half is read here and routed to the game.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::broadcast::ClientMessage;
use crate::error::TransportError;
use crate::game::Game;
use crate::registry::{Connection, ConnectionHandle};
use crate::routes::ApiError;
use crate::state::ServerState;

/// Sending half of an axum WebSocket
pub struct WsConnection {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsConnection {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self, reason: &str) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: reason.to_string().into(),
        };
        let sent = sink.send(Message::Close(Some(frame))).await;
        let closed = sink.close().await;
        sent.and(closed).map_err(|e| TransportError::Send(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketParams {
    pub player_id: String,
}

/// `GET /ws/game/{gameId}?playerId=..`
pub async fn game_socket(
    ws: WebSocketUpgrade,
    Path(game_id): Path<String>,
    Query(params): Query<SocketParams>,
    State(state): State<Arc<ServerState>>,
) -> Response {
    let Some(game) = state.games.get(&game_id) else {
        return ApiError::GameNotFound(game_id).into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, game, params.player_id))
}

async fn handle_socket(socket: WebSocket, game: Arc<Game>, player_id: String) {
    let (sender, mut receiver) = socket.split();
    let conn: ConnectionHandle = Arc::new(WsConnection::new(sender));

    if let Err(e) = game.register_connection(&player_id, Arc::clone(&conn)).await {
        tracing::warn!(
            "Game {}: connection for {} refused: {}",
            game.id(),
            player_id,
            e
        );
        game.send_error(&conn, &e.to_string()).await;
        game.close_connection(&player_id, &conn, &e.to_string()).await;
        return;
    }

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("Game {}: read error from {}: {}", game.id(), player_id, e);
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(ClientMessage::Move(request)) => {
                if let Err(e) = game.make_move_as(&player_id, request) {
                    tracing::warn!(
                        "Game {}: rejected move from {}: {}",
                        game.id(),
                        player_id,
                        e
                    );
                    game.send_error(&conn, &e.to_string()).await;
                }
            }
            Err(e) => {
                tracing::debug!("Game {}: bad message from {}: {}", game.id(), player_id, e);
                game.send_error(&conn, &format!("invalid message: {e}")).await;
            }
        }
    }

    game.release_connection(&player_id, &conn);
}
