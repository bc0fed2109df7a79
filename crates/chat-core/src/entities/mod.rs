//! Domain entities - core business objects

mod chat;
mod friendship;
mod message;
mod user;

pub use chat::{Chat, ChatMember, MemberPair};
pub use friendship::Friendship;
pub use message::{Message, MAX_CONTENT_CHARS, MAX_NONCE_LEN};
pub use user::{User, UserSummary};
