//! Message entity - represents a chat message

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Maximum message length, counted in characters
pub const MAX_CONTENT_CHARS: usize = 1000;

/// Maximum length of a client correlation id
pub const MAX_NONCE_LEN: usize = 64;

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub chat_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: String,
    /// Correlation id supplied by the sending client, echoed on broadcast
    pub nonce: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: Snowflake, chat_id: Snowflake, sender_id: Snowflake, content: String) -> Self {
        Self {
            id,
            chat_id,
            sender_id,
            content,
            nonce: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Check content bounds: not blank and at most [`MAX_CONTENT_CHARS`] characters
    pub fn validate_content(content: &str) -> Result<(), DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::EmptyContent);
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(DomainError::ContentTooLong {
                max: MAX_CONTENT_CHARS,
            });
        }
        Ok(())
    }

    pub fn validate_nonce(nonce: Option<&str>) -> Result<(), DomainError> {
        match nonce {
            Some(n) if n.is_empty() || n.chars().count() > MAX_NONCE_LEN => {
                Err(DomainError::ValidationError(format!(
                    "nonce must be 1..={MAX_NONCE_LEN} characters"
                )))
            }
            _ => Ok(()),
        }
    }
}
