//! Gateway protocol definitions
//!
//! Close codes and inbound frame decoding. The event types themselves live in
//! `chat_core::protocol`.

mod close_codes;
mod frame;

pub use close_codes::CloseCode;
pub use frame::{decode_frame, FrameError, CLIENT_EVENT_NAMES};
