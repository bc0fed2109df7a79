//! Connection management
//!
//! Tracks live WebSocket connections and routes outbound events to them.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionId};
pub use manager::ConnectionManager;
