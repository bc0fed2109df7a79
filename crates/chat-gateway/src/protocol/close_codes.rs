//! WebSocket close codes
//!
//! Gateway-specific codes in the 4000 range.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
///
/// Sent when the relay ends a connection to indicate the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Event name the relay does not know
    UnknownEvent = 4001,
    /// Frame is not a JSON event envelope, or is binary
    DecodeError = 4002,
    /// Outbound buffer overflowed
    SlowConsumer = 4008,
    /// No heartbeat within the timeout
    SessionTimeout = 4009,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownEvent),
            4002 => Some(Self::DecodeError),
            4008 => Some(Self::SlowConsumer),
            4009 => Some(Self::SessionTimeout),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownEvent => "Unknown event",
            Self::DecodeError => "Invalid frame encoding",
            Self::SlowConsumer => "Outbound buffer overflow",
            Self::SessionTimeout => "Heartbeat timeout",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::UnknownEvent => "UnknownEvent",
            Self::DecodeError => "DecodeError",
            Self::SlowConsumer => "SlowConsumer",
            Self::SessionTimeout => "SessionTimeout",
        }
    }

    /// Code and reason for a close frame
    #[must_use]
    pub fn close_frame(self) -> (u16, &'static str) {
        (self.as_u16(), self.description())
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
