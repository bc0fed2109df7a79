//! # chat-gateway
//!
//! Real-time relay between chat clients.
//!
//! Tracks which users are online, which connections watch which chats,
//! persists and fans out messages in storage order, and forwards typing
//! signals. A thin REST surface exposes the chat operations the session
//! client needs around the socket.

pub mod connection;
pub mod handlers;
pub mod presence;
pub mod protocol;
pub mod relay;
pub mod rooms;
pub mod server;

#[cfg(test)]
mod testing;

pub use presence::{LocalPresenceRegistry, PresenceRegistry, PresenceTransition};
pub use server::{
    create_app, create_gateway_state, create_router, run, serve, serve_with_shutdown,
    GatewayState,
};
