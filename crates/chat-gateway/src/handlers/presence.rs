//! Presence handler
//!
//! `user_online` binds the connection to a user and announces the user when
//! they come online; disconnect announces them when they go offline. Both
//! update the registry and broadcast under the presence gate, so two racing
//! edges for one user reach every observer in the order they happened.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use chat_core::protocol::{PresenceStatus, ServerEvent, UserOnlinePayload};

/// Handles presence announcements
pub struct PresenceHandler;

impl PresenceHandler {
    /// Handle `user_online`
    ///
    /// Every other connection hears `user_status_changed` only when the user
    /// was offline before; the announcing connection always gets the current
    /// `online_users_list`.
    pub async fn handle(
        state: &GatewayState,
        connection: &Connection,
        payload: UserOnlinePayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let user_id = payload.user_id;

        if !connection.bind_user(user_id) {
            return Err(HandlerError::InvalidPayload(
                "connection is already identified as another user".to_string(),
            ));
        }

        let name = payload.user_info.as_ref().and_then(|info| info.name.as_deref());
        {
            let _gate = state.presence_gate().lock().await;
            let transition = state.presence().set_online(user_id, connection.id()).await;

            if let Some(transition) = transition {
                let notified = state.connections().broadcast_except(
                    Some(connection.id()),
                    &ServerEvent::UserStatusChanged(transition.status()),
                );
                tracing::info!(
                    connection_id = %connection.id(),
                    user_id = %user_id,
                    name = ?name,
                    notified = notified,
                    "User online"
                );
            } else {
                let record = state.presence().connection_of(user_id).await;
                tracing::debug!(
                    connection_id = %connection.id(),
                    user_id = %user_id,
                    record = ?record,
                    "Additional connection for online user"
                );
            }
        }

        let snapshot = state
            .presence()
            .online_snapshot()
            .await
            .into_iter()
            .map(|user_id| PresenceStatus {
                user_id,
                is_online: true,
            })
            .collect();

        if !connection.send(ServerEvent::OnlineUsersList(snapshot)).await {
            return Err(HandlerError::Internal(
                "Failed to send online users list".to_string(),
            ));
        }

        Ok(None)
    }

    /// Drop the connection's presence entry, announcing the offline edge
    pub async fn disconnect(state: &GatewayState, connection: &Connection) {
        let _gate = state.presence_gate().lock().await;
        let Some(transition) = state.presence().remove(connection.id()).await else {
            return;
        };

        let notified = state
            .connections()
            .broadcast_except(None, &ServerEvent::UserStatusChanged(transition.status()));
        tracing::info!(
            connection_id = %connection.id(),
            user_id = %transition.user_id(),
            notified = notified,
            "User offline"
        );
    }
}
