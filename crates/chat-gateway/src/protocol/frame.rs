//! Inbound frame decoding
//!
//! Splits failures into the ones that end the connection (not an envelope,
//! unknown event) and the ones reported back as a `VALIDATION_ERROR` (a known
//! event whose payload does not fit).

use chat_core::protocol::ClientEvent;
use chat_core::Snowflake;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::CloseCode;

/// Every event name a client may send
pub const CLIENT_EVENT_NAMES: [&str; 7] = [
    "user_online",
    "join_chat",
    "leave_chat",
    "send_message",
    "typing_start",
    "typing_stop",
    "heartbeat",
];

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not an event envelope: {0}")]
    Malformed(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("invalid {event} payload: {message}")]
    InvalidPayload {
        event: String,
        message: String,
        chat_id: Option<Snowflake>,
        nonce: Option<String>,
    },
}

impl FrameError {
    /// Close code for failures that end the connection
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Malformed(_) => Some(CloseCode::DecodeError),
            Self::UnknownEvent(_) => Some(CloseCode::UnknownEvent),
            Self::InvalidPayload { .. } => None,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PayloadHints {
    chat_id: Option<Snowflake>,
    nonce: Option<String>,
}

/// Decode one text frame into a client event
pub fn decode_frame(text: &str) -> Result<ClientEvent, FrameError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;
    let envelope = Envelope::deserialize(&value).map_err(|e| FrameError::Malformed(e.to_string()))?;

    if !CLIENT_EVENT_NAMES.contains(&envelope.event.as_str()) {
        return Err(FrameError::UnknownEvent(envelope.event));
    }

    ClientEvent::deserialize(&value).map_err(|e| {
        let hints = PayloadHints::deserialize(&envelope.data).unwrap_or_default();
        FrameError::InvalidPayload {
            event: envelope.event,
            message: e.to_string(),
            chat_id: hints.chat_id,
            nonce: hints.nonce,
        }
    })
}
