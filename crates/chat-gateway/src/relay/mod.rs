//! Message and typing fan-out
//!
//! `MessageRelay` persists chat messages and broadcasts them to the room;
//! `TypingBroadcaster` forwards ephemeral typing signals.

mod message;
mod typing;

pub use message::MessageRelay;
pub use typing::TypingBroadcaster;
