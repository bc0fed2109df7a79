//! Typing signal broadcaster
//!
//! Stateless: signals are forwarded, never stored. Receivers expire typing
//! indicators on their own.

use std::sync::Arc;

use chat_core::protocol::{ServerEvent, TypingPayload, TypingSignal};
use chat_core::Snowflake;

use crate::connection::{Connection, ConnectionId, ConnectionManager};
use crate::handlers::{HandlerError, HandlerResult};
use crate::rooms::RoomManager;

#[derive(Debug)]
pub struct TypingBroadcaster {
    connections: Arc<ConnectionManager>,
    rooms: Arc<RoomManager>,
}

impl TypingBroadcaster {
    pub fn new(connections: Arc<ConnectionManager>, rooms: Arc<RoomManager>) -> Self {
        Self { connections, rooms }
    }

    /// Forward `user_typing`; returns how many connections it reached
    pub fn start(&self, connection: &Connection, payload: TypingPayload) -> HandlerResult<usize> {
        let signal = self.authorize(connection, &payload)?;
        Ok(self.send_to_others(signal, &ServerEvent::UserTyping(signal)))
    }

    /// Forward `user_stop_typing`; returns how many connections it reached
    pub fn stop(&self, connection: &Connection, payload: TypingPayload) -> HandlerResult<usize> {
        let signal = self.authorize(connection, &payload)?;
        Ok(self.send_to_others(signal, &ServerEvent::UserStopTyping(signal)))
    }

    /// Clear the user's typing indicator in every room a closed connection left
    pub fn connection_closed(&self, user_id: Snowflake, rooms_left: &[Snowflake]) -> usize {
        rooms_left
            .iter()
            .map(|&chat_id| {
                let signal = TypingSignal { chat_id, user_id };
                self.send_to_others(signal, &ServerEvent::UserStopTyping(signal))
            })
            .sum()
    }

    fn authorize(
        &self,
        connection: &Connection,
        payload: &TypingPayload,
    ) -> HandlerResult<TypingSignal> {
        let user_id = connection.user_id().ok_or(HandlerError::NotAuthenticated)?;

        if payload.user_id.is_some_and(|claimed| claimed != user_id) {
            return Err(HandlerError::Forbidden(
                "typing signals can only be sent for the connected user".to_string(),
            ));
        }
        if !self.rooms.is_member(connection.id(), payload.chat_id) {
            return Err(HandlerError::Forbidden(format!(
                "join chat {} before sending typing signals",
                payload.chat_id
            )));
        }

        Ok(TypingSignal {
            chat_id: payload.chat_id,
            user_id,
        })
    }

    // None of the signalling user's connections receive their own signal
    fn send_to_others(&self, signal: TypingSignal, event: &ServerEvent) -> usize {
        let targets: Vec<ConnectionId> = self
            .rooms
            .members_of(signal.chat_id)
            .into_iter()
            .filter(|id| {
                self.connections
                    .get_connection(*id)
                    .is_some_and(|conn| conn.user_id() != Some(signal.user_id))
            })
            .collect();
        self.connections.send_to(targets, event)
    }
}
