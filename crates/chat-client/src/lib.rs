//! # chat-client
//!
//! Client side of a one-to-one conversation: a [`ChatSession`] state machine
//! with optimistic sends reconciled by nonce, typing indicators, friend
//! presence, and guarded history paging. Transports are pluggable through
//! [`ChatBackend`] and [`RelayLink`]; [`HttpChatBackend`] and [`WsRelayLink`]
//! talk to the gateway.

pub mod config;
pub mod error;
pub mod session;
pub mod timeline;
pub mod transport;
pub mod typing;

#[cfg(test)]
mod testing;

pub use config::SessionConfig;
pub use error::{ClientError, ClientResult};
pub use session::{ChatSession, HistoryKind, HistoryRequest, SendFailure, SessionState, Ticket};
pub use timeline::{Confirmation, PendingMessage, Timeline, TimelineEntry};
pub use transport::{ChatBackend, HttpChatBackend, RelayLink, WsRelayLink};
pub use typing::{LocalTyping, TypingSignalKind, TypingWatchdog};
