//! Room subscription handlers

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use chat_core::Snowflake;
use chat_service::ChatService;

/// Handles `join_chat` and `leave_chat`
pub struct RoomHandler;

impl RoomHandler {
    /// Subscribe the connection to a chat its user belongs to
    pub async fn join(
        state: &GatewayState,
        connection: &Connection,
        chat_id: Snowflake,
    ) -> HandlerResult<Option<CloseCode>> {
        let user_id = connection.user_id().ok_or(HandlerError::NotAuthenticated)?;

        ChatService::new(state.service_context())
            .require_member(chat_id, user_id)
            .await?;

        let joined = state.rooms().join(connection.id(), chat_id);
        tracing::debug!(
            connection_id = %connection.id(),
            chat_id = %chat_id,
            joined = joined,
            "join_chat"
        );

        Ok(None)
    }

    pub async fn leave(
        state: &GatewayState,
        connection: &Connection,
        chat_id: Snowflake,
    ) -> HandlerResult<Option<CloseCode>> {
        let left = state.rooms().leave(connection.id(), chat_id);
        tracing::debug!(
            connection_id = %connection.id(),
            chat_id = %chat_id,
            left = left,
            "leave_chat"
        );

        Ok(None)
    }
}
