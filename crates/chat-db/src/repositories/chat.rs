//! PostgreSQL implementation of ChatRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use chat_core::entities::{Chat, MemberPair};
use chat_core::error::DomainError;
use chat_core::traits::{ChatRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use crate::models::ChatModel;

use super::error::{map_db_error, map_fk_violation};

#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Chat>> {
        let result = sqlx::query_as::<_, ChatModel>(
            r"
            SELECT id, member_low, member_high, created_at, updated_at
            FROM chats
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Chat::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_direct(&self, pair: MemberPair) -> RepoResult<Option<Chat>> {
        let result = sqlx::query_as::<_, ChatModel>(
            r"
            SELECT id, member_low, member_high, created_at, updated_at
            FROM chats
            WHERE member_low = $1 AND member_high = $2
            ",
        )
        .bind(pair.low().into_inner())
        .bind(pair.high().into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Chat::try_from).transpose()
    }

    #[instrument(skip(self, chat), fields(chat_id = %chat.id))]
    async fn create_direct(&self, chat: &Chat) -> RepoResult<Chat> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // A concurrent creator for the same pair makes this a no-op
        let inserted = sqlx::query_as::<_, ChatModel>(
            r"
            INSERT INTO chats (id, member_low, member_high, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (member_low, member_high) DO NOTHING
            RETURNING id, member_low, member_high, created_at, updated_at
            ",
        )
        .bind(chat.id.into_inner())
        .bind(chat.members.low().into_inner())
        .bind(chat.members.high().into_inner())
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_fk_violation(e, || DomainError::UserNotFound(chat.members.high())))?;

        let Some(model) = inserted else {
            tx.rollback().await.map_err(map_db_error)?;
            debug!("Chat for pair already exists, returning the stored one");
            return self
                .find_direct(chat.members)
                .await?
                .ok_or_else(|| {
                    DomainError::InternalError("chat vanished after conflict".to_string())
                });
        };

        sqlx::query(
            r"
            INSERT INTO chat_members (chat_id, user_id)
            VALUES ($1, $2), ($1, $3)
            ",
        )
        .bind(chat.id.into_inner())
        .bind(chat.members.low().into_inner())
        .bind(chat.members.high().into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Chat::try_from(model)
    }

    #[instrument(skip(self))]
    async fn is_member(&self, chat_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM chat_members WHERE chat_id = $1 AND user_id = $2
            )
            ",
        )
        .bind(chat_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<Chat>> {
        let results = sqlx::query_as::<_, ChatModel>(
            r"
            SELECT c.id, c.member_low, c.member_high, c.created_at, c.updated_at
            FROM chats c
            INNER JOIN chat_members m ON m.chat_id = c.id
            WHERE m.user_id = $1
            ORDER BY c.updated_at DESC, c.id DESC
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(Chat::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn touch(&self, chat_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE chats
            SET updated_at = GREATEST(updated_at, $2)
            WHERE id = $1
            ",
        )
        .bind(chat_id.into_inner())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ChatNotFound(chat_id));
        }

        Ok(())
    }
}
