//! Server state management
//!
//! Shared state handed to every route handler.

use std::time::Duration;

use crate::broadcast::DEFAULT_WRITE_TIMEOUT;
use crate::manager::GameManager;

/// Server-wide shared state
pub struct ServerState {
    pub games: GameManager,
}

impl ServerState {
    pub fn new() -> Self {
        Self::with_write_timeout(DEFAULT_WRITE_TIMEOUT)
    }

    pub fn with_write_timeout(write_timeout: Duration) -> Self {
        Self {
            games: GameManager::new(write_timeout),
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
