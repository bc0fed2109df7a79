//! Event envelopes
//!
//! `ClientEvent` is everything a client may send, `ServerEvent` everything the
//! relay may push. Both are adjacently tagged so the JSON shape is
//! `{"event": ..., "data": ...}`.

use serde::{Deserialize, Serialize};

use super::payloads::{
    ChatRef, ErrorPayload, HelloPayload, MessagePayload, PresenceStatus, SendMessagePayload,
    TypingPayload, TypingSignal, UserOnlinePayload,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    UserOnline(UserOnlinePayload),
    JoinChat(ChatRef),
    LeaveChat(ChatRef),
    SendMessage(SendMessagePayload),
    TypingStart(TypingPayload),
    TypingStop(TypingPayload),
    Heartbeat,
}

impl ClientEvent {
    /// Wire name, used for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserOnline(_) => "user_online",
            Self::JoinChat(_) => "join_chat",
            Self::LeaveChat(_) => "leave_chat",
            Self::SendMessage(_) => "send_message",
            Self::TypingStart(_) => "typing_start",
            Self::TypingStop(_) => "typing_stop",
            Self::Heartbeat => "heartbeat",
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Hello(HelloPayload),
    HeartbeatAck,
    ReceiveMessage(Box<MessagePayload>),
    UserTyping(TypingSignal),
    UserStopTyping(TypingSignal),
    UserStatusChanged(PresenceStatus),
    OnlineUsersList(Vec<PresenceStatus>),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello(_) => "hello",
            Self::HeartbeatAck => "heartbeat_ack",
            Self::ReceiveMessage(_) => "receive_message",
            Self::UserTyping(_) => "user_typing",
            Self::UserStopTyping(_) => "user_stop_typing",
            Self::UserStatusChanged(_) => "user_status_changed",
            Self::OnlineUsersList(_) => "online_users_list",
            Self::Error(_) => "error",
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ServerEvent({})", self.name())
    }
}
