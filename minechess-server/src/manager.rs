//! Owner of all live games
//!
//! Constructed once at startup and shared with the handlers through
//! [`crate::ServerState`].

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use rand::Rng;
use rustc_hash::FxHashMap;

use crate::broadcast::{FullView, DEFAULT_WRITE_TIMEOUT};
use crate::game::Game;

/// Length of generated game ids
pub const GAME_ID_LEN: usize = 6;

pub struct GameManager {
    games: RwLock<FxHashMap<String, Arc<Game>>>,
    write_timeout: Duration,
}

impl GameManager {
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            games: RwLock::new(FxHashMap::default()),
            write_timeout,
        }
    }

    /// Create a game under a fresh random id
    pub fn create_game(&self) -> Arc<Game> {
        let mut rng = rand::thread_rng();
        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);

        let id = loop {
            let candidate = random_id(&mut rng);
            if !games.contains_key(&candidate) {
                break candidate;
            }
        };

        let game = Arc::new(Game::with_view_filter(
            id.clone(),
            Arc::new(FullView),
            self.write_timeout,
        ));
        games.insert(id, Arc::clone(&game));
        tracing::info!("Created game {} ({} active)", game.id(), games.len());
        game
    }

    pub fn get(&self, game_id: &str) -> Option<Arc<Game>> {
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        games.get(game_id).cloned()
    }

    pub fn remove(&self, game_id: &str) -> Option<Arc<Game>> {
        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);
        let removed = games.remove(game_id);
        if removed.is_some() {
            tracing::info!("Removed game {}", game_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_TIMEOUT)
    }
}

fn random_id(rng: &mut impl Rng) -> String {
    (0..GAME_ID_LEN)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}
