//! Individual WebSocket connection
//!
//! The relay-side handle for one live transport session.

use crate::protocol::CloseCode;
use chat_core::protocol::ServerEvent;
use chat_core::Snowflake;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Process-unique connection identifier
///
/// Issued in increasing order, so a larger id is a more recently established
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single WebSocket connection
pub struct Connection {
    id: ConnectionId,

    /// Set once by `user_online`
    user_id: RwLock<Option<Snowflake>>,

    /// Outbound queue drained by the socket's send task
    sender: mpsc::Sender<ServerEvent>,

    /// Flipped to true when the relay wants the socket closed
    closing: watch::Sender<bool>,
    close_code: Mutex<Option<CloseCode>>,

    last_heartbeat: Mutex<Instant>,
    created_at: Instant,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<ServerEvent>) -> Arc<Self> {
        let (closing, _) = watch::channel(false);
        Arc::new(Self {
            id,
            user_id: RwLock::new(None),
            sender,
            closing,
            close_code: Mutex::new(None),
            last_heartbeat: Mutex::new(Instant::now()),
            created_at: Instant::now(),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The user this connection announced, if any
    pub fn user_id(&self) -> Option<Snowflake> {
        *self.user_id.read()
    }

    /// Bind the connection to a user
    ///
    /// A connection belongs to one user for its whole life. Returns false,
    /// leaving the binding untouched, when it is already bound to someone else.
    pub fn bind_user(&self, user_id: Snowflake) -> bool {
        let mut current = self.user_id.write();
        match *current {
            Some(existing) => existing == user_id,
            None => {
                *current = Some(user_id);
                true
            }
        }
    }

    pub fn record_heartbeat(&self) {
        *self.last_heartbeat.lock() = Instant::now();
    }

    pub fn time_since_heartbeat(&self) -> Duration {
        self.last_heartbeat.lock().elapsed()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Queue an event, waiting for buffer space
    ///
    /// Used for replies to this connection's own requests. Returns false when
    /// the socket is gone.
    pub async fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    /// Queue an event without waiting
    ///
    /// Used for fan-out. A full buffer means the client is not keeping up; the
    /// event is dropped and the connection is closed so it resyncs on reconnect.
    pub fn try_send(&self, event: ServerEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    connection_id = %self.id,
                    event = event.name(),
                    "Outbound buffer full, closing connection"
                );
                self.close(CloseCode::SlowConsumer);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the socket to close with `code`; the first code wins
    pub fn close(&self, code: CloseCode) {
        self.close_code.lock().get_or_insert(code);
        self.closing.send_replace(true);
    }

    /// Ask the socket to close without a gateway close code
    pub fn shutdown(&self) {
        self.closing.send_replace(true);
    }

    pub fn close_code(&self) -> Option<CloseCode> {
        *self.close_code.lock()
    }

    pub fn is_closing(&self) -> bool {
        *self.closing.borrow()
    }

    /// Watch for a close request
    pub fn closing(&self) -> watch::Receiver<bool> {
        self.closing.subscribe()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id())
            .field("created_at", &self.created_at)
            .finish()
    }
}
