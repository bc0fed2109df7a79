//! Business logic services
//!
//! The collaborator operations the relay and the REST surface call:
//! opening chats, persisting messages, paging history.

pub mod chat;
pub mod context;
pub mod error;
pub mod message;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::ChatService;
pub use context::ServiceContext;
pub use error::{ServiceError, ServiceResult};
pub use message::MessageService;
