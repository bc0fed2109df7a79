//! REST response bodies
//!
//! Shared by the gateway (serializing) and the session client (parsing).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payloads::MessagePayload;
use crate::entities::UserSummary;
use crate::value_objects::Snowflake;

/// A chat with its members and a page of history, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: Snowflake,
    pub members: Vec<UserSummary>,
    pub messages: Vec<MessagePayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry of a user's chat list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryResponse {
    pub id: Snowflake,
    pub members: Vec<UserSummary>,
    #[serde(default)]
    pub last_message: Option<MessagePayload>,
    pub updated_at: DateTime<Utc>,
}

/// One page of history, oldest first
///
/// `next_cursor` is set when older messages exist; pass it back as `cursor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<MessagePayload>,
    #[serde(default)]
    pub next_cursor: Option<Snowflake>,
}

impl MessagePage {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}
