//! Heartbeat handler

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::CloseCode;
use chat_core::protocol::ServerEvent;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Record the heartbeat and acknowledge it
    pub async fn handle(connection: &Connection) -> HandlerResult<Option<CloseCode>> {
        connection.record_heartbeat();

        tracing::trace!(connection_id = %connection.id(), "Heartbeat received");

        if !connection.send(ServerEvent::HeartbeatAck).await {
            return Err(HandlerError::Internal(
                "Failed to send heartbeat ACK".to_string(),
            ));
        }

        Ok(None)
    }
}
