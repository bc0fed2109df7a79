//! Wire protocol shared by the relay and its clients
//!
//! Every frame is a JSON text frame of the form
//! `{"event": "<snake_case name>", "data": <payload>}` with camelCase payload
//! fields. Snowflake ids travel as strings. REST bodies use the same casing.

mod events;
mod payloads;
mod rest;

pub use events::{ClientEvent, ServerEvent};
pub use rest::{ChatResponse, ChatSummaryResponse, MessagePage};
pub use payloads::{
    ChatRef, ErrorPayload, HelloPayload, MessagePayload, PresenceStatus, SendMessagePayload,
    TypingPayload, TypingSignal, UserInfo, UserOnlinePayload,
};
