//! Message service
//!
//! Persists chat messages and serves paginated history.

use chat_core::entities::Message;
use chat_core::traits::MessageQuery;
use chat_core::Snowflake;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::dto::{MessagePage, MessagePayload, UserDirectory, MAX_PAGE_SIZE};

use super::chat::ChatService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Message service
pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Persist a message from a chat member
    ///
    /// Content must be non-blank and at most 1000 characters. A non-member
    /// (or an unknown chat) is rejected before anything is written. Every
    /// lookup happens before the insert, so an error means no row exists.
    /// The returned payload has the sender resolved and the nonce echoed.
    #[instrument(skip(self, content, nonce))]
    pub async fn create_message(
        &self,
        chat_id: Snowflake,
        sender_id: Snowflake,
        content: String,
        nonce: Option<String>,
    ) -> ServiceResult<MessagePayload> {
        Message::validate_content(&content)?;
        Message::validate_nonce(nonce.as_deref())?;

        ChatService::new(self.ctx)
            .require_member(chat_id, sender_id)
            .await?;
        let sender = self.ctx.user_repo().find_by_id(sender_id).await?;

        let message = Message {
            id: self.ctx.generate_id(),
            chat_id,
            sender_id,
            content,
            nonce,
            created_at: Utc::now(),
        };

        self.ctx.message_repo().create(&message).await?;

        // The message is stored; a failed bump only affects chat list order
        if let Err(e) = self.ctx.chat_repo().touch(chat_id, message.created_at).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to bump chat activity");
        }

        info!(message_id = %message.id, chat_id = %chat_id, "Message created");

        Ok(UserDirectory::new(sender).message(message))
    }

    /// One page of history for a member, oldest first
    ///
    /// `cursor` is exclusive; `next_cursor` is the oldest returned id when
    /// older messages remain.
    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        chat_id: Snowflake,
        user_id: Snowflake,
        cursor: Option<Snowflake>,
        limit: i64,
    ) -> ServiceResult<MessagePage> {
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ServiceError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        ChatService::new(self.ctx)
            .require_member(chat_id, user_id)
            .await?;

        // One extra row tells whether an older page exists
        let mut messages = self
            .ctx
            .message_repo()
            .find_by_chat(
                chat_id,
                MessageQuery {
                    before: cursor,
                    limit: limit + 1,
                },
            )
            .await?;

        let has_more = messages.len() > usize::try_from(limit).unwrap_or(usize::MAX);
        if has_more {
            messages.pop();
        }
        let next_cursor = if has_more {
            messages.last().map(|m| m.id)
        } else {
            None
        };
        messages.reverse();

        let mut sender_ids: Vec<Snowflake> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();
        let directory = UserDirectory::new(self.ctx.user_repo().find_many(&sender_ids).await?);

        Ok(MessagePage {
            messages: messages.into_iter().map(|m| directory.message(m)).collect(),
            next_cursor,
        })
    }
}
