//! Gateway state
//!
//! Application state shared by the socket handler and the REST routes.

use crate::connection::ConnectionManager;
use crate::presence::{LocalPresenceRegistry, PresenceRegistry};
use crate::relay::{MessageRelay, TypingBroadcaster};
use crate::rooms::RoomManager;
use chat_common::AppConfig;
use chat_service::ServiceContext;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Gateway application state
///
/// Every component is shared; cloning the state is cheap.
#[derive(Clone)]
pub struct GatewayState {
    service_context: Arc<ServiceContext>,
    connections: Arc<ConnectionManager>,
    presence: Arc<dyn PresenceRegistry>,
    presence_gate: Arc<Mutex<()>>,
    rooms: Arc<RoomManager>,
    relay: Arc<MessageRelay>,
    typing: Arc<TypingBroadcaster>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a gateway state with the in-process presence registry
    pub fn new(service_context: ServiceContext, config: AppConfig) -> Self {
        Self::with_presence(
            service_context,
            Arc::new(LocalPresenceRegistry::new()),
            config,
        )
    }

    /// Create a gateway state with a custom presence registry
    pub fn with_presence(
        service_context: ServiceContext,
        presence: Arc<dyn PresenceRegistry>,
        config: AppConfig,
    ) -> Self {
        let service_context = Arc::new(service_context);
        let connections = ConnectionManager::new_shared();
        let rooms = Arc::new(RoomManager::new());
        let relay = Arc::new(MessageRelay::new(
            Arc::clone(&service_context),
            Arc::clone(&connections),
            Arc::clone(&rooms),
        ));
        let typing = Arc::new(TypingBroadcaster::new(
            Arc::clone(&connections),
            Arc::clone(&rooms),
        ));

        Self {
            service_context,
            connections,
            presence,
            presence_gate: Arc::new(Mutex::new(())),
            rooms,
            relay,
            typing,
            config: Arc::new(config),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn presence(&self) -> &dyn PresenceRegistry {
        self.presence.as_ref()
    }

    /// Held across a presence update and its announcement
    pub fn presence_gate(&self) -> &Mutex<()> {
        &self.presence_gate
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn relay(&self) -> &MessageRelay {
        &self.relay
    }

    pub fn typing(&self) -> &TypingBroadcaster {
        &self.typing
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connections", &self.connections.connection_count())
            .field("rooms", &self.rooms.room_count())
            .field("config", &"AppConfig")
            .finish()
    }
}
