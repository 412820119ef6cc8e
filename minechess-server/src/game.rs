//! Game aggregate
//!
//! One `Game` owns the authoritative [`GameState`] behind a single exclusive
//! lock plus the registry of connections watching it. The state lock is
//! never held across an await point; every network write happens on a
//! snapshot.
//!
//! Snapshots taken after each move are published on a `watch` channel and
//! pushed by a single broadcast task per game, so a connection never sees
//! an older state after a newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use minechess_core::{Color, GameState, MoveError, MoveRequest, Ply, Position, Resolution};
use tokio::sync::watch;

use crate::broadcast::{
    BroadcastReport, Broadcaster, FullView, ViewFilter, DEFAULT_WRITE_TIMEOUT, SUPERSEDED_REASON,
};
use crate::error::GameError;
use crate::registry::{ConnectionHandle, ConnectionRegistry};

pub struct Game {
    id: String,
    state: Mutex<GameState>,
    connections: Arc<ConnectionRegistry>,
    broadcaster: Broadcaster,
    updates: watch::Sender<Arc<GameState>>,
    worker_started: AtomicBool,
}

impl Game {
    /// New game in the starting position, everyone sees the full state
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_view_filter(id, Arc::new(FullView), DEFAULT_WRITE_TIMEOUT)
    }

    pub fn with_view_filter(
        id: impl Into<String>,
        view: Arc<dyn ViewFilter>,
        write_timeout: Duration,
    ) -> Self {
        let id = id.into();
        let connections = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(&id, Arc::clone(&connections), view, write_timeout);
        let state = GameState::new();
        let (updates, _) = watch::channel(Arc::new(state.clone()));
        Self {
            id,
            state: Mutex::new(state),
            connections,
            broadcaster,
            updates,
            worker_started: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock_state(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // SEATING
    // ========================================================================

    /// Seat a player, white first
    ///
    /// Re-joining with an already seated id returns the same color.
    pub fn add_player(&self, player_id: &str) -> Result<Color, GameError> {
        if player_id.is_empty() {
            return Err(GameError::InvalidPlayerId);
        }
        let color = self.lock_state().players.seat(player_id).ok_or(GameError::GameFull)?;
        tracing::info!("Game {}: player {} seated as {}", self.id, player_id, color);
        Ok(color)
    }

    pub fn is_player_in_game(&self, player_id: &str) -> bool {
        self.lock_state().players.color_of(player_id).is_some()
    }

    /// Whether at least one seat is still open
    pub fn can_spectate(&self) -> bool {
        self.lock_state().players.has_open_seat()
    }

    // ========================================================================
    // CONNECTIONS
    // ========================================================================

    /// Attach a connection for a player
    ///
    /// The caller must be seated, or the game must still have an open seat.
    /// A previous connection for the same id is closed before the new one
    /// takes its place, then the new connection receives its own snapshot.
    pub async fn register_connection(
        &self,
        player_id: &str,
        conn: ConnectionHandle,
    ) -> Result<(), GameError> {
        if player_id.is_empty() {
            return Err(GameError::InvalidPlayerId);
        }
        let authorized = {
            let state = self.lock_state();
            state.players.color_of(player_id).is_some() || state.players.has_open_seat()
        };
        if !authorized {
            tracing::warn!("Game {}: rejected connection from {}", self.id, player_id);
            return Err(GameError::NotAuthorized);
        }

        let previous = self.connections.get(player_id);
        if let Some(old) = &previous {
            tracing::info!(
                "Game {}: closing existing connection for player {}",
                self.id,
                player_id
            );
            self.broadcaster.close(player_id, old, SUPERSEDED_REASON).await;
        }

        // Another registration may have slipped in while the old one was closing
        if let Some(displaced) = self.connections.insert(player_id, Arc::clone(&conn)) {
            let already_closed = previous.as_ref().is_some_and(|old| Arc::ptr_eq(old, &displaced));
            if !already_closed && !Arc::ptr_eq(&displaced, &conn) {
                self.broadcaster.close(player_id, &displaced, SUPERSEDED_REASON).await;
            }
        }
        tracing::info!("Game {}: connection registered for player {}", self.id, player_id);

        let snapshot = self.get_state();
        if let Err(e) = self.broadcaster.send_state(player_id, &conn, &snapshot).await {
            tracing::warn!(
                "Game {}: failed to send initial state to {}: {}",
                self.id,
                player_id,
                e
            );
            self.connections.remove_if_same(player_id, &conn);
            return Err(e.into());
        }

        Ok(())
    }

    /// Drop whatever connection is registered for a player. Idempotent.
    pub fn unregister_connection(&self, player_id: &str) {
        if self.connections.remove(player_id).is_some() {
            tracing::info!("Game {}: unregistered connection for {}", self.id, player_id);
        }
    }

    /// Drop a player's mapping only if it is still `conn`
    ///
    /// Used by a transport when its socket ends, so a newer connection for
    /// the same player survives.
    pub fn release_connection(&self, player_id: &str, conn: &ConnectionHandle) {
        if self.connections.remove_if_same(player_id, conn) {
            tracing::info!("Game {}: released connection for {}", self.id, player_id);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send a close notification to one connection, bounded by the write
    /// timeout. Failures are logged.
    pub async fn close_connection(&self, player_id: &str, conn: &ConnectionHandle, reason: &str) {
        self.broadcaster.close(player_id, conn, reason).await;
    }

    /// Send an `error` envelope to one connection
    pub async fn send_error(&self, conn: &ConnectionHandle, message: &str) {
        if let Err(e) = self.broadcaster.send_error(conn, message).await {
            tracing::debug!("Game {}: failed to deliver error message: {}", self.id, e);
        }
    }

    // ========================================================================
    // MOVES
    // ========================================================================

    /// Validate and apply a move for whichever side is on move
    ///
    /// On success the new state is handed to the background broadcast; the
    /// caller does not wait for any connection.
    pub fn make_move(&self, request: MoveRequest) -> Result<Ply, GameError> {
        self.ensure_broadcast_worker();
        let (ply, resolve) = {
            let mut state = self.lock_state();
            let ply = state.make_move(request)?;
            self.publish(&state);
            (ply, state.resolve)
        };
        self.after_move(&ply, resolve);
        Ok(ply)
    }

    /// Like [`Game::make_move`], but only for the player seated on the side
    /// to move
    pub fn make_move_as(&self, player_id: &str, request: MoveRequest) -> Result<Ply, GameError> {
        self.ensure_broadcast_worker();
        let (ply, resolve) = {
            let mut state = self.lock_state();
            if state.resolve.is_some() {
                return Err(MoveError::GameOver.into());
            }
            match state.players.color_of(player_id) {
                None => return Err(GameError::NotAuthorized),
                Some(color) if color != state.to_move => return Err(MoveError::NotYourTurn.into()),
                Some(_) => {}
            }
            let ply = state.make_move(request)?;
            self.publish(&state);
            (ply, state.resolve)
        };
        self.after_move(&ply, resolve);
        Ok(ply)
    }

    fn after_move(&self, ply: &Ply, resolve: Option<Resolution>) {
        tracing::debug!(
            "Game {}: {} played {}",
            self.id,
            ply.piece.color,
            ply.notation
        );
        if let Some(resolve) = resolve {
            tracing::info!("Game {}: finished by {:?}", self.id, resolve);
        }
    }

    /// Copy of the current state
    pub fn get_state(&self) -> GameState {
        self.lock_state().clone()
    }

    pub fn legal_moves_from(&self, from: Position) -> Vec<Position> {
        self.lock_state().legal_moves_from(from)
    }

    // ========================================================================
    // BROADCAST
    // ========================================================================

    /// Push the current state to every connection and wait for the result
    pub async fn broadcast_state(&self) -> BroadcastReport {
        let snapshot = self.get_state();
        self.broadcaster.broadcast(&snapshot).await
    }

    /// Publish a snapshot for the broadcast task
    ///
    /// Called with the state lock held, so snapshots are published in the
    /// order the moves were applied.
    fn publish(&self, state: &GameState) {
        self.updates.send_replace(Arc::new(state.clone()));
    }

    /// Start this game's broadcast task on first use
    ///
    /// Outside a tokio runtime (plain unit tests) there is nobody to push to
    /// and no task is started.
    fn ensure_broadcast_worker(&self) {
        if self.worker_started.load(Ordering::Acquire) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("Game {}: no runtime, broadcasts disabled", self.id);
            return;
        };
        if self.worker_started.swap(true, Ordering::AcqRel) {
            return;
        }
        let updates = self.updates.subscribe();
        handle.spawn(run_broadcast_worker(self.broadcaster.clone(), updates));
    }
}

/// Push every published snapshot, skipping ones superseded while a previous
/// broadcast was still writing. Ends when the game is dropped.
async fn run_broadcast_worker(
    broadcaster: Broadcaster,
    mut updates: watch::Receiver<Arc<GameState>>,
) {
    while updates.changed().await.is_ok() {
        let snapshot = Arc::clone(&updates.borrow_and_update());
        broadcaster.broadcast(&snapshot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> MoveRequest {
        MoveRequest::parse(text).unwrap()
    }

    #[test]
    fn test_add_player_seats_white_then_black() {
        let game = Game::new("abcdef");
        assert_eq!(game.add_player("alice").unwrap(), Color::White);
        assert_eq!(game.add_player("bob").unwrap(), Color::Black);
        assert!(matches!(game.add_player("carol"), Err(GameError::GameFull)));
        assert_eq!(game.add_player("alice").unwrap(), Color::White);

        let state = game.get_state();
        assert_eq!(state.players.white, "alice");
        assert_eq!(state.players.black, "bob");
    }

    #[test]
    fn test_empty_player_id_rejected() {
        let game = Game::new("abcdef");
        assert!(matches!(game.add_player(""), Err(GameError::InvalidPlayerId)));
        assert_eq!(game.add_player("bob").unwrap(), Color::White);
        assert!(matches!(game.add_player(""), Err(GameError::InvalidPlayerId)));
        assert_eq!(game.add_player("carol").unwrap(), Color::Black);
    }

    #[test]
    fn test_spectate_only_while_seat_open() {
        let game = Game::new("abcdef");
        assert!(game.can_spectate());
        game.add_player("alice").unwrap();
        assert!(game.can_spectate());
        game.add_player("bob").unwrap();
        assert!(!game.can_spectate());
        assert!(game.is_player_in_game("bob"));
        assert!(!game.is_player_in_game("carol"));
    }

    #[test]
    fn test_make_move_without_runtime() {
        let game = Game::new("abcdef");
        let ply = game.make_move(mv("e2e4")).unwrap();
        assert_eq!(ply.notation, "e4");
        assert_eq!(game.get_state().to_move, Color::Black);
        assert!(matches!(
            game.make_move(mv("e2e4")),
            Err(GameError::Move(MoveError::EmptySquare(_)))
        ));
    }

    #[test]
    fn test_make_move_as_checks_seat() {
        let game = Game::new("abcdef");
        game.add_player("alice").unwrap();
        game.add_player("bob").unwrap();

        assert!(matches!(
            game.make_move_as("mallory", mv("e2e4")),
            Err(GameError::NotAuthorized)
        ));
        assert!(matches!(
            game.make_move_as("bob", mv("e2e4")),
            Err(GameError::Move(MoveError::NotYourTurn))
        ));
        game.make_move_as("alice", mv("e2e4")).unwrap();
        game.make_move_as("bob", mv("e7e5")).unwrap();
        assert_eq!(game.get_state().move_history.len(), 1);
    }

    #[test]
    fn test_legal_moves_from() {
        let game = Game::new("abcdef");
        let mut moves = game.legal_moves_from(Position::new(6, 7));
        moves.sort_by_key(|p| (p.x, p.y));
        assert_eq!(moves, vec![Position::new(5, 5), Position::new(7, 5)]);
        assert!(game.legal_moves_from(Position::new(4, 1)).is_empty());
    }
}
