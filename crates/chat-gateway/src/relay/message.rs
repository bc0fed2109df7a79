//! Message relay
//!
//! Persistence and fan-out of one chat happen under that chat's lock, so every
//! room member sees messages in the order they were stored.

use std::sync::Arc;

use chat_core::entities::Message;
use chat_core::protocol::{MessagePayload, SendMessagePayload, ServerEvent};
use chat_core::Snowflake;
use chat_service::{MessageService, ServiceContext, ServiceError};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use validator::Validate;

use crate::connection::{Connection, ConnectionManager};
use crate::handlers::{HandlerError, HandlerResult};
use crate::rooms::RoomManager;

/// Accepts `send_message`, persists it, and broadcasts the stored message
pub struct MessageRelay {
    service_context: Arc<ServiceContext>,
    connections: Arc<ConnectionManager>,
    rooms: Arc<RoomManager>,
    chat_locks: DashMap<Snowflake, Arc<Mutex<()>>>,
}

impl MessageRelay {
    pub fn new(
        service_context: Arc<ServiceContext>,
        connections: Arc<ConnectionManager>,
        rooms: Arc<RoomManager>,
    ) -> Self {
        Self {
            service_context,
            connections,
            rooms,
            chat_locks: DashMap::new(),
        }
    }

    /// Persist a message from `connection` and broadcast it to the chat's room
    ///
    /// The broadcast reaches every connection in the room, the sender's own
    /// included, with the client nonce echoed. The originating connection
    /// also gets it when it has not joined the room. On any failure nothing is
    /// broadcast and the error is returned for the sender alone.
    #[instrument(skip_all, fields(connection_id = %connection.id(), chat_id = %payload.chat_id))]
    pub async fn handle_incoming(
        &self,
        connection: &Connection,
        payload: SendMessagePayload,
    ) -> HandlerResult<MessagePayload> {
        let sender_id = connection.user_id().ok_or(HandlerError::NotAuthenticated)?;
        payload
            .validate()
            .map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;
        Message::validate_content(&payload.content).map_err(ServiceError::from)?;

        let SendMessagePayload {
            chat_id,
            content,
            nonce,
        } = payload;

        let lock = self.chat_lock(chat_id);
        let result = {
            let _guard = lock.lock().await;

            let stored = MessageService::new(&self.service_context)
                .create_message(chat_id, sender_id, content, nonce)
                .await;

            match stored {
                Ok(message) => {
                    let mut targets = self.rooms.members_of(chat_id);
                    if !targets.contains(&connection.id()) {
                        targets.push(connection.id());
                    }
                    let event = ServerEvent::ReceiveMessage(Box::new(message.clone()));
                    let delivered = self.connections.send_to(targets, &event);

                    debug!(message_id = %message.id, delivered = delivered, "Message relayed");
                    Ok(message)
                }
                Err(e) => {
                    if e.is_persistence() {
                        warn!(sender_id = %sender_id, error = %e, "Failed to persist message");
                    }
                    Err(HandlerError::from(e))
                }
            }
        };
        drop(lock);
        self.release_chat_lock(chat_id);

        result
    }

    /// Number of chats with a live lock entry
    pub fn active_chats(&self) -> usize {
        self.chat_locks.len()
    }

    fn chat_lock(&self, chat_id: Snowflake) -> Arc<Mutex<()>> {
        Arc::clone(self.chat_locks.entry(chat_id).or_default().value())
    }

    // Clones are only taken under the shard lock, so a count of one means no
    // sender holds or waits on this entry
    fn release_chat_lock(&self, chat_id: Snowflake) {
        self.chat_locks
            .remove_if(&chat_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for MessageRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRelay")
            .field("active_chats", &self.chat_locks.len())
            .finish_non_exhaustive()
    }
}
