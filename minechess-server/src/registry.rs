//! Per-game connection registry
//!
//! Maps a player identifier to the single outbound connection currently
//! serving it. The lock only guards the map; callers take a snapshot and
//! perform all I/O after the guard is released.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::error::TransportError;

/// Outbound half of a client connection
///
/// The transport layer owns the inbound half; the core only writes.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Write one text frame
    async fn send_text(&self, text: String) -> Result<(), TransportError>;

    /// Send a close notification, then close the transport
    async fn close(&self, reason: &str) -> Result<(), TransportError>;
}

/// Shared handle to a registered connection
pub type ConnectionHandle = Arc<dyn Connection>;

/// Player id -> active connection for one game
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<FxHashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection currently registered for a player
    pub fn get(&self, player_id: &str) -> Option<ConnectionHandle> {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections.get(player_id).cloned()
    }

    /// Install a connection, returning the one it replaced
    pub fn insert(&self, player_id: &str, conn: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        connections.insert(player_id.to_string(), conn)
    }

    /// Remove a player's mapping. Idempotent.
    pub fn remove(&self, player_id: &str) -> Option<ConnectionHandle> {
        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        connections.remove(player_id)
    }

    /// Remove a player's mapping only if it still points at `conn`
    ///
    /// Returns whether an entry was removed. A connection that has already
    /// been superseded leaves its replacement alone.
    pub fn remove_if_same(&self, player_id: &str, conn: &ConnectionHandle) -> bool {
        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        match connections.get(player_id) {
            Some(current) if Arc::ptr_eq(current, conn) => {
                connections.remove(player_id);
                true
            }
            _ => false,
        }
    }

    /// Copy of all current entries, taken under the read lock
    pub fn snapshot(&self) -> Vec<(String, ConnectionHandle)> {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections
            .iter()
            .map(|(id, conn)| (id.clone(), Arc::clone(conn)))
            .collect()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn send_text(&self, _text: String) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close(&self, _reason: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn handle() -> ConnectionHandle {
        Arc::new(NullConnection)
    }

    #[test]
    fn test_insert_replaces() {
        let registry = ConnectionRegistry::new();
        let first = handle();
        let second = handle();

        assert!(registry.insert("alice", Arc::clone(&first)).is_none());
        let replaced = registry.insert("alice", Arc::clone(&second)).unwrap();
        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.get("alice").unwrap(), &second));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        registry.insert("alice", handle());
        assert!(registry.remove("alice").is_some());
        assert!(registry.remove("alice").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_if_same_spares_replacement() {
        let registry = ConnectionRegistry::new();
        let stale = handle();
        let fresh = handle();
        registry.insert("alice", Arc::clone(&stale));
        registry.insert("alice", Arc::clone(&fresh));

        assert!(!registry.remove_if_same("alice", &stale));
        assert!(registry.contains("alice"));
        assert!(registry.remove_if_same("alice", &fresh));
        assert!(!registry.contains("alice"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = ConnectionRegistry::new();
        registry.insert("alice", handle());
        registry.insert("bob", handle());

        let snapshot = registry.snapshot();
        registry.remove("alice");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
    }
}
