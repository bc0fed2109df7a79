//! Presence registry
//!
//! Maps user ids to their connection of record. The registry reports
//! transitions; broadcasting them is the caller's job, under
//! `GatewayState::presence_gate` so observers see edges in registry order.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chat_core::protocol::PresenceStatus;
use chat_core::Snowflake;
use parking_lot::Mutex;

use crate::connection::ConnectionId;

/// An edge in a user's online state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    Online(Snowflake),
    Offline(Snowflake),
}

impl PresenceTransition {
    pub fn user_id(self) -> Snowflake {
        match self {
            Self::Online(id) | Self::Offline(id) => id,
        }
    }

    pub fn is_online(self) -> bool {
        matches!(self, Self::Online(_))
    }

    pub fn status(self) -> PresenceStatus {
        PresenceStatus {
            user_id: self.user_id(),
            is_online: self.is_online(),
        }
    }
}

/// Who is online, and through which connection
///
/// Implementations must report `Online` only on the offline to online edge and
/// `Offline` only on the online to offline edge. Removal is keyed by
/// connection so a stale connection closing late never evicts a newer one.
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// Register `connection` for `user_id`; the most recently established
    /// connection becomes the one of record
    async fn set_online(
        &self,
        user_id: Snowflake,
        connection: ConnectionId,
    ) -> Option<PresenceTransition>;

    /// Drop the entry owned by `connection`
    async fn remove(&self, connection: ConnectionId) -> Option<PresenceTransition>;

    /// Unknown users are offline
    async fn is_online(&self, user_id: Snowflake) -> bool;

    async fn online_snapshot(&self) -> BTreeSet<Snowflake>;

    async fn connection_of(&self, user_id: Snowflake) -> Option<ConnectionId>;
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Snowflake, BTreeSet<ConnectionId>>,
    owners: HashMap<ConnectionId, Snowflake>,
}

/// In-process presence registry
///
/// Every connection a user has announced is kept; the highest id is the
/// connection of record. One lock covers both indexes so each call is atomic.
#[derive(Debug, Default)]
pub struct LocalPresenceRegistry {
    state: Mutex<State>,
}

impl LocalPresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceRegistry for LocalPresenceRegistry {
    async fn set_online(
        &self,
        user_id: Snowflake,
        connection: ConnectionId,
    ) -> Option<PresenceTransition> {
        let mut state = self.state.lock();

        if let Some(owner) = state.owners.get(&connection) {
            if *owner != user_id {
                tracing::warn!(
                    connection_id = %connection,
                    owner = %owner,
                    user_id = %user_id,
                    "Connection already registered for another user"
                );
                return None;
            }
        }

        state.owners.insert(connection, user_id);
        let connections = state.users.entry(user_id).or_default();
        let was_online = !connections.is_empty();
        connections.insert(connection);

        (!was_online).then_some(PresenceTransition::Online(user_id))
    }

    async fn remove(&self, connection: ConnectionId) -> Option<PresenceTransition> {
        let mut state = self.state.lock();
        let user_id = state.owners.remove(&connection)?;

        let connections = state.users.get_mut(&user_id)?;
        connections.remove(&connection);
        if connections.is_empty() {
            state.users.remove(&user_id);
            Some(PresenceTransition::Offline(user_id))
        } else {
            None
        }
    }

    async fn is_online(&self, user_id: Snowflake) -> bool {
        self.state.lock().users.contains_key(&user_id)
    }

    async fn online_snapshot(&self) -> BTreeSet<Snowflake> {
        self.state.lock().users.keys().copied().collect()
    }

    async fn connection_of(&self, user_id: Snowflake) -> Option<ConnectionId> {
        self.state
            .lock()
            .users
            .get(&user_id)
            .and_then(|connections| connections.last().copied())
    }
}
