//! Message entity <-> model mapper

use chat_core::entities::Message;
use chat_core::value_objects::Snowflake;

use crate::models::MessageModel;

impl From<MessageModel> for Message {
    fn from(model: MessageModel) -> Self {
        Message {
            id: Snowflake::new(model.id),
            chat_id: Snowflake::new(model.chat_id),
            sender_id: Snowflake::new(model.sender_id),
            content: model.content,
            nonce: model.nonce,
            created_at: model.created_at,
        }
    }
}
