//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in chat-core.
//! Each repository handles database operations for a specific domain entity.

mod chat;
mod error;
mod friendship;
mod message;
mod user;

pub use chat::PgChatRepository;
pub use friendship::PgFriendshipRepository;
pub use message::PgMessageRepository;
pub use user::PgUserRepository;
