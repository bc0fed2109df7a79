//! Chat service
//!
//! Opening direct chats between friends and listing a user's chats.

use chat_core::entities::{Chat, MemberPair};
use chat_core::traits::MessageQuery;
use chat_core::{DomainError, Snowflake};
use tracing::{debug, info, instrument};

use crate::dto::{ChatResponse, ChatSummaryResponse, UserDirectory, MAX_PAGE_SIZE};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Chat service
pub struct ChatService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ChatService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Return the chat between `user_id` and `friend_id`, creating it on first
    /// open. Requires a friendship in either direction. The response carries
    /// both members and the latest messages, oldest first.
    #[instrument(skip(self))]
    pub async fn get_or_create_chat(
        &self,
        user_id: Snowflake,
        friend_id: Snowflake,
    ) -> ServiceResult<ChatResponse> {
        let pair = MemberPair::new(user_id, friend_id)?;

        if !self.friendship_exists(user_id, friend_id).await? {
            return Err(DomainError::NotFriends.into());
        }

        let chat = match self.ctx.chat_repo().find_direct(pair).await? {
            Some(chat) => chat,
            None => {
                let created = self
                    .ctx
                    .chat_repo()
                    .create_direct(&Chat::new(self.ctx.generate_id(), pair))
                    .await?;
                info!(
                    chat_id = %created.id,
                    user_id = %user_id,
                    friend_id = %friend_id,
                    "Chat opened"
                );
                created
            }
        };

        let mut messages = self
            .ctx
            .message_repo()
            .find_by_chat(chat.id, MessageQuery::latest(MAX_PAGE_SIZE))
            .await?;
        messages.reverse();

        let members = self.ctx.user_repo().find_many(&chat.member_ids()).await?;
        let directory = UserDirectory::new(members);
        let messages = messages.into_iter().map(|m| directory.message(m)).collect();

        Ok(directory.chat(&chat, messages))
    }

    /// Whether a friendship row links the two users in either direction
    #[instrument(skip(self))]
    pub async fn friendship_exists(&self, a: Snowflake, b: Snowflake) -> ServiceResult<bool> {
        Ok(self.ctx.friendship_repo().exists(a, b).await?)
    }

    /// All chats of a user, most recently active first, each with its latest message
    #[instrument(skip(self))]
    pub async fn user_chats(&self, user_id: Snowflake) -> ServiceResult<Vec<ChatSummaryResponse>> {
        let chats = self.ctx.chat_repo().find_by_user(user_id).await?;
        debug!(count = chats.len(), "Loaded chats");

        let mut member_ids: Vec<Snowflake> = chats.iter().flat_map(Chat::member_ids).collect();
        member_ids.sort_unstable();
        member_ids.dedup();
        let directory = UserDirectory::new(self.ctx.user_repo().find_many(&member_ids).await?);

        let mut summaries = Vec::with_capacity(chats.len());
        for chat in &chats {
            let last = self.ctx.message_repo().latest(chat.id).await?;
            summaries.push(directory.chat_summary(chat, last));
        }
        Ok(summaries)
    }

    /// Fail unless `user_id` belongs to the chat
    #[instrument(skip(self))]
    pub async fn require_member(
        &self,
        chat_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<()> {
        if self.ctx.chat_repo().is_member(chat_id, user_id).await? {
            Ok(())
        } else {
            Err(ServiceError::from(DomainError::NotChatMember(chat_id)))
        }
    }
}
