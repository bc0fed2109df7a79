//! Client event handlers
//!
//! Routes each decoded `ClientEvent` to the component that owns it.

mod error;
mod heartbeat;
mod presence;
mod rooms;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use presence::PresenceHandler;
pub use rooms::RoomHandler;

use crate::connection::Connection;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use chat_core::protocol::ClientEvent;
use chat_core::Snowflake;

/// Dispatch incoming client events to the appropriate handler
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one client event to completion
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Connection,
        event: ClientEvent,
    ) -> HandlerResult<Option<CloseCode>> {
        match event {
            ClientEvent::UserOnline(payload) => {
                PresenceHandler::handle(state, connection, payload).await
            }
            ClientEvent::JoinChat(chat) => RoomHandler::join(state, connection, chat.chat_id).await,
            ClientEvent::LeaveChat(chat) => {
                RoomHandler::leave(state, connection, chat.chat_id).await
            }
            ClientEvent::SendMessage(payload) => {
                state.relay().handle_incoming(connection, payload).await?;
                Ok(None)
            }
            ClientEvent::TypingStart(payload) => {
                state.typing().start(connection, payload)?;
                Ok(None)
            }
            ClientEvent::TypingStop(payload) => {
                state.typing().stop(connection, payload)?;
                Ok(None)
            }
            ClientEvent::Heartbeat => HeartbeatHandler::handle(connection).await,
        }
    }
}

/// Chat id and nonce an error report for `event` should carry
pub fn error_context(event: &ClientEvent) -> (Option<Snowflake>, Option<String>) {
    match event {
        ClientEvent::SendMessage(p) => (Some(p.chat_id), p.nonce.clone()),
        ClientEvent::JoinChat(c) | ClientEvent::LeaveChat(c) => (Some(c.chat_id), None),
        ClientEvent::TypingStart(p) | ClientEvent::TypingStop(p) => (Some(p.chat_id), None),
        ClientEvent::UserOnline(_) | ClientEvent::Heartbeat => (None, None),
    }
}
