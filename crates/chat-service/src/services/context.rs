//! Service context - dependency container for services
//!
//! Holds the storage collaborators and the id generator. Tests swap single
//! repositories through `new`.

use std::sync::Arc;

use chat_core::traits::{ChatRepository, FriendshipRepository, MessageRepository, UserRepository};
use chat_core::SnowflakeGenerator;
use chat_db::{
    MemoryStore, PgChatRepository, PgFriendshipRepository, PgMessageRepository, PgPool,
    PgUserRepository,
};

/// Service context containing all dependencies
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct ServiceContext {
    user_repo: Arc<dyn UserRepository>,
    friendship_repo: Arc<dyn FriendshipRepository>,
    chat_repo: Arc<dyn ChatRepository>,
    message_repo: Arc<dyn MessageRepository>,
    snowflake_generator: Arc<SnowflakeGenerator>,
}

impl ServiceContext {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        friendship_repo: Arc<dyn FriendshipRepository>,
        chat_repo: Arc<dyn ChatRepository>,
        message_repo: Arc<dyn MessageRepository>,
        snowflake_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            friendship_repo,
            chat_repo,
            message_repo,
            snowflake_generator,
        }
    }

    /// Context backed by PostgreSQL repositories sharing one pool
    pub fn postgres(pool: PgPool, snowflake_generator: Arc<SnowflakeGenerator>) -> Self {
        Self::new(
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgFriendshipRepository::new(pool.clone())),
            Arc::new(PgChatRepository::new(pool.clone())),
            Arc::new(PgMessageRepository::new(pool)),
            snowflake_generator,
        )
    }

    /// Context backed by an in-memory store
    pub fn memory(store: &MemoryStore, snowflake_generator: Arc<SnowflakeGenerator>) -> Self {
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            snowflake_generator,
        )
    }

    // === Repositories ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn friendship_repo(&self) -> &dyn FriendshipRepository {
        self.friendship_repo.as_ref()
    }

    pub fn chat_repo(&self) -> &dyn ChatRepository {
        self.chat_repo.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    // === Ids ===

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> chat_core::Snowflake {
        self.snowflake_generator.generate()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("snowflake_generator", &self.snowflake_generator)
            .finish()
    }
}
