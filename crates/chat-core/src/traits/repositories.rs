//! Repository traits (ports) - the storage collaborator seen from the domain
//!
//! The relay never touches storage directly. Everything it needs to persist or
//! look up goes through these traits, implemented by `chat-db`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Chat, MemberPair, Message, User};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>>;

    /// Resolve several users at once; unknown ids are skipped
    async fn find_many(&self, ids: &[Snowflake]) -> RepoResult<Vec<User>>;
}

// ============================================================================
// Friendship Repository
// ============================================================================

#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// Whether a friendship row links the two users in either direction
    async fn exists(&self, a: Snowflake, b: Snowflake) -> RepoResult<bool>;
}

// ============================================================================
// Chat Repository
// ============================================================================

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Chat>>;

    /// Find the direct chat for a member pair
    async fn find_direct(&self, pair: MemberPair) -> RepoResult<Option<Chat>>;

    /// Insert the chat and both member rows unless one already exists for the
    /// pair. Returns the stored chat, which may be a concurrent creator's.
    async fn create_direct(&self, chat: &Chat) -> RepoResult<Chat>;

    async fn is_member(&self, chat_id: Snowflake, user_id: Snowflake) -> RepoResult<bool>;

    /// All chats of a user, most recently active first
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<Chat>>;

    /// Bump `updated_at` after a new message
    async fn touch(&self, chat_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;
}

// ============================================================================
// Message Repository
// ============================================================================

/// Pagination options for message queries
///
/// `before` is exclusive. Results are the `limit` newest messages older than
/// the cursor.
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub before: Option<Snowflake>,
    pub limit: i64,
}

impl MessageQuery {
    pub fn latest(limit: i64) -> Self {
        Self {
            before: None,
            limit,
        }
    }
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: &Message) -> RepoResult<()>;

    /// Messages in a chat, newest first
    async fn find_by_chat(&self, chat_id: Snowflake, query: MessageQuery)
        -> RepoResult<Vec<Message>>;

    /// Most recent message of a chat
    async fn latest(&self, chat_id: Snowflake) -> RepoResult<Option<Message>>;
}
