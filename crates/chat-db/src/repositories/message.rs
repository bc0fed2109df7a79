//! PostgreSQL implementation of MessageRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::entities::Message;
use chat_core::error::DomainError;
use chat_core::traits::{MessageQuery, MessageRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use crate::models::MessageModel;

use super::error::{map_db_error, map_fk_violation};

/// PostgreSQL implementation of MessageRepository
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(message_id = %message.id, chat_id = %message.chat_id))]
    async fn create(&self, message: &Message) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO messages (id, chat_id, sender_id, content, nonce, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(message.id.into_inner())
        .bind(message.chat_id.into_inner())
        .bind(message.sender_id.into_inner())
        .bind(&message.content)
        .bind(message.nonce.as_deref())
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_fk_violation(e, || DomainError::ChatNotFound(message.chat_id)))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_chat(
        &self,
        chat_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        let limit = query.limit.clamp(1, 100);

        let results = match query.before {
            Some(before) => {
                // Older than the cursor (scrolling up)
                sqlx::query_as::<_, MessageModel>(
                    r"
                    SELECT id, chat_id, sender_id, content, nonce, created_at
                    FROM messages
                    WHERE chat_id = $1 AND id < $2
                    ORDER BY id DESC
                    LIMIT $3
                    ",
                )
                .bind(chat_id.into_inner())
                .bind(before.into_inner())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MessageModel>(
                    r"
                    SELECT id, chat_id, sender_id, content, nonce, created_at
                    FROM messages
                    WHERE chat_id = $1
                    ORDER BY id DESC
                    LIMIT $2
                    ",
                )
                .bind(chat_id.into_inner())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Message::from).collect())
    }

    #[instrument(skip(self))]
    async fn latest(&self, chat_id: Snowflake) -> RepoResult<Option<Message>> {
        let mut latest = self.find_by_chat(chat_id, MessageQuery::latest(1)).await?;
        Ok(latest.pop())
    }
}
