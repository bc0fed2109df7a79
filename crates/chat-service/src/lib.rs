//! # chat-service
//!
//! Application layer containing the collaborator operations, services, and DTOs.

pub mod dto;
pub mod services;

pub use services::{ChatService, MessageService, ServiceContext, ServiceError, ServiceResult};
