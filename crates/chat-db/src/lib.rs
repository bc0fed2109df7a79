//! # chat-db
//!
//! Storage layer implementing the repository traits of `chat-core`.
//!
//! ## Overview
//!
//! - PostgreSQL repositories via SQLx, with `FromRow` models and model to
//!   entity mappers
//! - Connection pool management and the schema in `migrations/`
//! - [`MemoryStore`], an in-memory implementation of every repository used
//!   when no database is configured and in tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_db::{create_pool, run_migrations, PgChatRepository};
//!
//! async fn example(config: &chat_common::DatabaseConfig) -> Result<(), sqlx::Error> {
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     let chats = PgChatRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_with, run_migrations, PgPool, PoolTimeouts};
pub use repositories::{
    PgChatRepository, PgFriendshipRepository, PgMessageRepository, PgUserRepository,
};
