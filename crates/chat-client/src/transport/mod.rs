//! Transports the session talks through
//!
//! `ChatBackend` covers the request/response chat operations, `RelayLink` the
//! outbound half of the relay socket. Inbound relay events are handed to the
//! session by whoever owns the socket.

mod http;
mod ws;

pub use http::HttpChatBackend;
pub use ws::WsRelayLink;

use async_trait::async_trait;
use chat_core::protocol::{ChatResponse, ClientEvent, MessagePage};
use chat_core::Snowflake;

use crate::error::ClientResult;

/// Chat operations served over request/response
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open the chat with a friend, creating it on first use
    async fn get_or_create_chat(&self, friend_id: Snowflake) -> ClientResult<ChatResponse>;

    /// One page of history older than `cursor` (newest page when `None`)
    async fn list_messages(
        &self,
        chat_id: Snowflake,
        cursor: Option<Snowflake>,
        limit: i64,
    ) -> ClientResult<MessagePage>;
}

/// Outbound side of a relay connection
#[async_trait]
pub trait RelayLink: Send + Sync {
    async fn send(&self, event: ClientEvent) -> ClientResult<()>;
}
