//! Room membership
//!
//! One room per chat. A connection can sit in many rooms; every room keeps
//! the set of connections subscribed to it.

use std::collections::HashSet;

use chat_core::Snowflake;
use dashmap::DashMap;

use crate::connection::ConnectionId;

/// Tracks which connections are subscribed to which chat
///
/// Both directions are indexed so disconnect cleanup does not scan every room.
/// Mutations for one connection come from its own receive task and its
/// cleanup, which never overlap.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: DashMap<Snowflake, HashSet<ConnectionId>>,
    subscriptions: DashMap<ConnectionId, HashSet<Snowflake>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe; returns false if the connection was already in the room
    pub fn join(&self, connection: ConnectionId, chat_id: Snowflake) -> bool {
        let added = self.rooms.entry(chat_id).or_default().insert(connection);
        self.subscriptions
            .entry(connection)
            .or_default()
            .insert(chat_id);

        if added {
            tracing::trace!(connection_id = %connection, chat_id = %chat_id, "Joined room");
        }
        added
    }

    /// Unsubscribe; returns false if the connection was not in the room
    pub fn leave(&self, connection: ConnectionId, chat_id: Snowflake) -> bool {
        let removed = self.remove_member(chat_id, connection);
        self.subscriptions
            .remove_if_mut(&connection, |_, chats| {
                chats.remove(&chat_id);
                chats.is_empty()
            });

        if removed {
            tracing::trace!(connection_id = %connection, chat_id = %chat_id, "Left room");
        }
        removed
    }

    /// Remove the connection from every room; returns the rooms it was in
    pub fn leave_all(&self, connection: ConnectionId) -> Vec<Snowflake> {
        let Some((_, chats)) = self.subscriptions.remove(&connection) else {
            return Vec::new();
        };

        let mut left: Vec<Snowflake> = chats
            .into_iter()
            .filter(|chat_id| self.remove_member(*chat_id, connection))
            .collect();
        left.sort_unstable();
        left
    }

    pub fn members_of(&self, chat_id: Snowflake) -> Vec<ConnectionId> {
        self.rooms
            .get(&chat_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, connection: ConnectionId) -> Vec<Snowflake> {
        self.subscriptions
            .get(&connection)
            .map(|chats| chats.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, connection: ConnectionId, chat_id: Snowflake) -> bool {
        self.rooms
            .get(&chat_id)
            .is_some_and(|members| members.contains(&connection))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // Empty rooms are dropped so the map only holds live rooms
    fn remove_member(&self, chat_id: Snowflake, connection: ConnectionId) -> bool {
        let mut removed = false;
        self.rooms.remove_if_mut(&chat_id, |_, members| {
            removed = members.remove(&connection);
            members.is_empty()
        });
        removed
    }
}
