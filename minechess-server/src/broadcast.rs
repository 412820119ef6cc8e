//! State pushes to registered connections
//!
//! Every outbound message uses the `{ "type": .., "payload": .. }` envelope.
//! Each recipient gets its own filtered view of the state; writes to
//! different recipients run concurrently and fail independently.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use minechess_core::{GameState, MoveRequest};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::registry::{ConnectionHandle, ConnectionRegistry};

/// Default bound on a single connection write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reason sent with the close notification when a player reconnects
pub const SUPERSEDED_REASON: &str = "New connection established";

// ============================================================================
// MESSAGES
// ============================================================================

/// Server -> client envelope
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage<'a> {
    GameState(&'a GameState),
    Error(&'a str),
}

impl ServerMessage<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Client -> server envelope
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    Move(MoveRequest),
}

// ============================================================================
// VIEW FILTERING
// ============================================================================

/// Per-recipient redaction of the shared state
///
/// Hidden-information variants plug in here.
pub trait ViewFilter: Send + Sync {
    fn view_for<'a>(&self, player_id: &str, state: &'a GameState) -> Cow<'a, GameState>;
}

/// Everyone sees everything
#[derive(Clone, Copy, Debug, Default)]
pub struct FullView;

impl ViewFilter for FullView {
    fn view_for<'a>(&self, _player_id: &str, state: &'a GameState) -> Cow<'a, GameState> {
        Cow::Borrowed(state)
    }
}

// ============================================================================
// BROADCASTER
// ============================================================================

/// Outcome of one broadcast pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients that received the message
    pub delivered: usize,
    /// Recipients dropped from the registry after a failed write
    pub pruned: Vec<String>,
    /// Recipients whose view could not be serialized
    pub skipped: usize,
}

enum Delivery {
    Delivered,
    Skipped,
    Failed(TransportError),
}

/// Pushes game state to the connections of one game
#[derive(Clone)]
pub struct Broadcaster {
    game_id: Arc<str>,
    connections: Arc<ConnectionRegistry>,
    view: Arc<dyn ViewFilter>,
    write_timeout: Duration,
}

impl Broadcaster {
    pub fn new(
        game_id: &str,
        connections: Arc<ConnectionRegistry>,
        view: Arc<dyn ViewFilter>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            game_id: Arc::from(game_id),
            connections,
            view,
            write_timeout,
        }
    }

    /// Push a state snapshot to every registered connection
    ///
    /// The registry is snapshotted first; no lock is held during writes.
    /// Connections whose write fails or times out are removed.
    pub async fn broadcast(&self, state: &GameState) -> BroadcastReport {
        let recipients = self.connections.snapshot();

        let writes = recipients.into_iter().map(|(player_id, conn)| async move {
            let delivery = self.deliver(&player_id, &conn, state).await;
            (player_id, conn, delivery)
        });

        let mut report = BroadcastReport::default();
        for (player_id, conn, delivery) in join_all(writes).await {
            match delivery {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Skipped => report.skipped += 1,
                Delivery::Failed(e) => {
                    tracing::warn!(
                        "Game {}: dropping connection for player {}: {}",
                        self.game_id,
                        player_id,
                        e
                    );
                    self.connections.remove_if_same(&player_id, &conn);
                    report.pruned.push(player_id);
                }
            }
        }

        tracing::debug!(
            "Game {}: broadcast delivered={} pruned={} skipped={}",
            self.game_id,
            report.delivered,
            report.pruned.len(),
            report.skipped
        );
        report
    }

    /// Send one player's view to a single connection
    pub async fn send_state(
        &self,
        player_id: &str,
        conn: &ConnectionHandle,
        state: &GameState,
    ) -> Result<(), TransportError> {
        match self.deliver(player_id, conn, state).await {
            Delivery::Failed(e) => Err(e),
            Delivery::Delivered | Delivery::Skipped => Ok(()),
        }
    }

    /// Send an `error` envelope to a single connection
    pub async fn send_error(&self, conn: &ConnectionHandle, message: &str) -> Result<(), TransportError> {
        match ServerMessage::Error(message).to_json() {
            Ok(text) => self.write(conn, text).await,
            Err(e) => {
                tracing::warn!("Game {}: failed to serialize error message: {}", self.game_id, e);
                Ok(())
            }
        }
    }

    /// Close a connection, bounded by the write timeout
    pub async fn close(&self, player_id: &str, conn: &ConnectionHandle, reason: &str) {
        let result = match tokio::time::timeout(self.write_timeout, conn.close(reason)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.write_timeout)),
        };
        if let Err(e) = result {
            tracing::debug!(
                "Game {}: closing connection for player {} failed: {}",
                self.game_id,
                player_id,
                e
            );
        }
    }

    async fn deliver(&self, player_id: &str, conn: &ConnectionHandle, state: &GameState) -> Delivery {
        let view = self.view.view_for(player_id, state);
        let text = match ServerMessage::GameState(&view).to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Game {}: failed to serialize state for player {}: {}",
                    self.game_id,
                    player_id,
                    e
                );
                return Delivery::Skipped;
            }
        };

        match self.write(conn, text).await {
            Ok(()) => Delivery::Delivered,
            Err(e) => Delivery::Failed(e),
        }
    }

    async fn write(&self, conn: &ConnectionHandle, text: String) -> Result<(), TransportError> {
        match tokio::time::timeout(self.write_timeout, conn.send_text(text)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.write_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minechess_core::{Color, Position};
    use serde_json::Value;

    #[test]
    fn test_game_state_envelope() {
        let state = GameState::new();
        let text = ServerMessage::GameState(&state).to_json().unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "gameState");
        assert_eq!(json["payload"]["toMove"], "white");
    }

    #[test]
    fn test_error_envelope() {
        let text = ServerMessage::Error("not your turn").to_json().unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"], "not your turn");
    }

    #[test]
    fn test_client_move_message() {
        let text = r#"{"type":"move","payload":{"from":{"x":4,"y":6},"to":{"x":4,"y":4},"promotion":""}}"#;
        let ClientMessage::Move(request) = serde_json::from_str(text).unwrap();
        assert_eq!(request.from, Position::new(4, 6));
        assert_eq!(request.to, Position::new(4, 4));
        assert_eq!(request.promotion, None);
    }

    #[test]
    fn test_full_view_is_identity() {
        let state = GameState::new();
        let view = FullView.view_for("anyone", &state);
        assert!(matches!(view, Cow::Borrowed(_)));
        assert_eq!(view.to_move, Color::White);
    }
}
