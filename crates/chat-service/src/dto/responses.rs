//! Response DTOs for API endpoints
//!
//! Chat and message bodies live in `chat_core::protocol` so the session
//! client parses exactly what the gateway writes.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use chat_core::protocol::{
    ChatResponse, ChatSummaryResponse, MessagePage, MessagePayload, PresenceStatus,
};

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Number of open relay connections
    pub connections: usize,
}

impl HealthResponse {
    pub fn healthy(connections: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            connections,
        }
    }
}
