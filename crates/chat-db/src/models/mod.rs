//! Database models - SQLx-compatible structs for PostgreSQL tables

mod chat;
mod message;
mod user;

pub use chat::ChatModel;
pub use message::MessageModel;
pub use user::UserModel;
