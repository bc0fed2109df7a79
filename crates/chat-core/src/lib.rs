//! # chat-core
//!
//! Domain layer containing entities, value objects, repository traits, and the
//! wire protocol spoken between the relay and its clients.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod protocol;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Chat, ChatMember, Friendship, MemberPair, Message, User, UserSummary, MAX_CONTENT_CHARS,
    MAX_NONCE_LEN,
};
pub use error::DomainError;
pub use protocol::{ClientEvent, ServerEvent};
pub use traits::{
    ChatRepository, FriendshipRepository, MessageQuery, MessageRepository, RepoResult,
    UserRepository,
};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
