//! Entity to DTO mappers

use std::collections::HashMap;

use chat_core::entities::{Chat, Message, User, UserSummary};
use chat_core::Snowflake;

use super::responses::{ChatResponse, ChatSummaryResponse, MessagePayload};

/// Display attributes of the users referenced by a response
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<Snowflake, UserSummary>,
}

impl UserDirectory {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.id, UserSummary::from(&user)))
                .collect(),
        }
    }

    /// Summary for `id`; unknown users get an empty placeholder
    pub fn summary(&self, id: Snowflake) -> UserSummary {
        self.users
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UserSummary::unknown(id))
    }

    pub fn message(&self, message: Message) -> MessagePayload {
        let sender = self.summary(message.sender_id);
        MessagePayload::new(message, sender)
    }

    pub fn chat(&self, chat: &Chat, messages: Vec<MessagePayload>) -> ChatResponse {
        ChatResponse {
            id: chat.id,
            members: chat.member_ids().map(|id| self.summary(id)).to_vec(),
            messages,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }

    pub fn chat_summary(&self, chat: &Chat, last_message: Option<Message>) -> ChatSummaryResponse {
        ChatSummaryResponse {
            id: chat.id,
            members: chat.member_ids().map(|id| self.summary(id)).to_vec(),
            last_message: last_message.map(|m| self.message(m)),
            updated_at: chat.updated_at,
        }
    }
}
