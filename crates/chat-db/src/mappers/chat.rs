//! Chat entity <-> model mapper

use chat_core::entities::{Chat, MemberPair};
use chat_core::error::DomainError;
use chat_core::value_objects::Snowflake;

use crate::models::ChatModel;

/// Rows satisfy `member_low < member_high` by table constraint; a row that
/// does not maps to `InternalError`.
impl TryFrom<ChatModel> for Chat {
    type Error = DomainError;

    fn try_from(model: ChatModel) -> Result<Self, Self::Error> {
        let members = MemberPair::new(
            Snowflake::new(model.member_low),
            Snowflake::new(model.member_high),
        )
        .map_err(|_| DomainError::InternalError(format!("chat {} has a single member", model.id)))?;

        Ok(Chat {
            id: Snowflake::new(model.id),
            members,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
