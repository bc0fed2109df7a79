//! Request DTOs for the REST surface
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use serde::Deserialize;
use validator::Validate;

use chat_core::Snowflake;

/// Default and maximum page size for history requests
pub const MAX_PAGE_SIZE: i64 = 50;

/// Open (or create) the chat with a friend
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub friend_id: Snowflake,
}

/// Query string of `GET /chats/:chat_id/messages`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MessagesQuery {
    /// Exclusive upper bound; only older messages are returned
    pub cursor: Option<Snowflake>,

    #[validate(range(min = 1, max = 50, message = "limit must be between 1 and 50"))]
    pub limit: Option<i64>,
}

impl MessagesQuery {
    pub fn limit_or_default(&self) -> i64 {
        self.limit.unwrap_or(MAX_PAGE_SIZE)
    }
}
