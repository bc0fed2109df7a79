//! PostgreSQL implementation of FriendshipRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::traits::{FriendshipRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use super::error::map_db_error;

#[derive(Clone)]
pub struct PgFriendshipRepository {
    pool: PgPool,
}

impl PgFriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    #[instrument(skip(self))]
    async fn exists(&self, a: Snowflake, b: Snowflake) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM friendships
                WHERE (user_id = $1 AND friend_id = $2)
                   OR (user_id = $2 AND friend_id = $1)
            )
            ",
        )
        .bind(a.into_inner())
        .bind(b.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }
}
