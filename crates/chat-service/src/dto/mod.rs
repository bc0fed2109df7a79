//! Data transfer objects for the REST surface and relay broadcasts

pub mod mappers;
pub mod requests;
pub mod responses;

pub use mappers::UserDirectory;
pub use requests::{CreateChatRequest, MessagesQuery, MAX_PAGE_SIZE};
pub use responses::{
    ChatResponse, ChatSummaryResponse, HealthResponse, MessagePage, MessagePayload,
    PresenceStatus,
};
