//! Connection manager
//!
//! Owns every live connection, keyed by `ConnectionId`, using DashMap for
//! thread-safe access.

use super::{Connection, ConnectionId};
use chat_core::protocol::ServerEvent;
use chat_core::Snowflake;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection under a fresh id
    pub fn add_connection(&self, sender: mpsc::Sender<ServerEvent>) -> Arc<Connection> {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = Connection::new(id, sender);
        self.connections.insert(id, Arc::clone(&connection));

        tracing::debug!(connection_id = %id, "Connection added");

        connection
    }

    pub fn remove_connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(&id).map(|(_, conn)| conn);
        if removed.is_some() {
            tracing::debug!(connection_id = %id, "Connection removed");
        }
        removed
    }

    pub fn get_connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn has_connection(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Connections bound to `user_id`
    pub fn user_connections(&self, user_id: Snowflake) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .filter(|r| r.user_id() == Some(user_id))
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// Queue `event` on each listed connection without waiting
    ///
    /// Ids that are no longer registered are skipped. Returns the number of
    /// connections the event was queued on.
    pub fn send_to(
        &self,
        ids: impl IntoIterator<Item = ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        let mut sent = 0;
        for id in ids {
            if let Some(conn) = self.get_connection(id) {
                if conn.try_send(event.clone()) {
                    sent += 1;
                }
            }
        }

        tracing::trace!(event = event.name(), sent = sent, "Event fanned out");

        sent
    }

    /// Queue `event` on every connection except `exclude`
    pub fn broadcast_except(&self, exclude: Option<ConnectionId>, event: &ServerEvent) -> usize {
        let targets: Vec<ConnectionId> = self
            .connections
            .iter()
            .map(|r| *r.key())
            .filter(|id| Some(*id) != exclude)
            .collect();
        self.send_to(targets, event)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Ask every connection to close; used on shutdown
    pub fn shutdown_all(&self) {
        for entry in &self.connections {
            entry.shutdown();
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .finish()
    }
}
