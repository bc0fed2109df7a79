//! Chat session state machine
//!
//! One `ChatSession` drives one open conversation with a friend:
//!
//! ```text
//! Initializing -> Ready
//! Initializing -> Errored -> (retry) -> Initializing
//! any          -> Closed
//! ```
//!
//! The session owns its state exclusively and only suspends while waiting on
//! the backend or the relay link, so no state is observed half-updated.
//! History loads are tagged with a [`Ticket`]; a result whose ticket is no
//! longer current (superseded or session closed) is dropped.

use std::time::Instant;

use chat_core::protocol::{
    ChatRef, ClientEvent, MessagePage, SendMessagePayload, ServerEvent, TypingPayload,
};
use chat_core::{Message, Snowflake, UserSummary};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{ClientError, ClientResult};
use crate::timeline::{Confirmation, Timeline, TimelineEntry};
use crate::transport::{ChatBackend, RelayLink};
use crate::typing::{LocalTyping, TypingSignalKind, TypingWatchdog};

/// Lifecycle of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Ready,
    Errored { code: String, message: String, retryable: bool },
    Closed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Errored { .. } => "errored",
            Self::Closed => "closed",
        }
    }

    fn from_error(error: &ClientError) -> Self {
        Self::Errored {
            code: error.code().to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Identifies one history request within one session lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// Newest page, used to reconcile sends after a reconnect
    Latest,
    /// The page before the oldest loaded message
    Older,
}

/// A history fetch the caller should run against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub ticket: Ticket,
    pub kind: HistoryKind,
    pub chat_id: Snowflake,
    pub cursor: Option<Snowflake>,
    pub limit: i64,
}

/// A send that was rolled back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub nonce: String,
    pub content: String,
    pub code: String,
    pub message: String,
}

pub struct ChatSession<B, L> {
    backend: B,
    link: L,
    config: SessionConfig,
    user_id: Snowflake,
    friend_id: Snowflake,
    state: SessionState,
    chat_id: Option<Snowflake>,
    members: Vec<UserSummary>,
    timeline: Timeline,
    remote_typing: TypingWatchdog,
    local_typing: LocalTyping,
    friend_online: bool,
    older_cursor: Option<Snowflake>,
    epoch: u64,
    next_seq: u64,
    history_in_flight: Option<Ticket>,
    failures: Vec<SendFailure>,
    recovered: Vec<String>,
}

impl<B: ChatBackend, L: RelayLink> ChatSession<B, L> {
    pub fn new(
        backend: B,
        link: L,
        user_id: Snowflake,
        friend_id: Snowflake,
        config: SessionConfig,
    ) -> Self {
        Self {
            remote_typing: TypingWatchdog::new(config.typing_window),
            local_typing: LocalTyping::new(config.typing_idle),
            backend,
            link,
            config,
            user_id,
            friend_id,
            state: SessionState::Initializing,
            chat_id: None,
            members: Vec::new(),
            timeline: Timeline::new(user_id),
            friend_online: false,
            older_cursor: None,
            epoch: 0,
            next_seq: 0,
            history_in_flight: None,
            failures: Vec::new(),
            recovered: Vec::new(),
        }
    }

    /// Open the conversation: get-or-create the chat, load its latest
    /// history, and subscribe to the room
    pub async fn open(&mut self) -> ClientResult<()> {
        if self.state != SessionState::Initializing {
            return Err(ClientError::InvalidState(self.state.name()));
        }

        let chat = match self.backend.get_or_create_chat(self.friend_id).await {
            Ok(chat) => chat,
            Err(e) => return Err(self.fail_open(e)),
        };

        self.chat_id = Some(chat.id);
        self.members = chat.members;
        let loaded = chat.messages.len();
        let (_, recovered) = self.timeline.merge_history(chat.messages);
        self.settle_recovered(recovered);
        self.older_cursor = if loaded as i64 >= self.config.page_size {
            self.timeline.oldest_id()
        } else {
            None
        };

        if let Err(e) = self
            .link
            .send(ClientEvent::JoinChat(ChatRef { chat_id: chat.id }))
            .await
        {
            return Err(self.fail_open(e));
        }

        tracing::debug!(chat_id = %chat.id, messages = loaded, "Chat session ready");
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Leave `Errored` and try opening again
    pub async fn retry(&mut self) -> ClientResult<()> {
        if !matches!(self.state, SessionState::Errored { .. }) {
            return Err(ClientError::InvalidState(self.state.name()));
        }
        self.epoch += 1;
        self.state = SessionState::Initializing;
        self.open().await
    }

    /// Send a message optimistically; returns the nonce of the pending entry
    pub async fn send(&mut self, content: &str, now: Instant) -> ClientResult<String> {
        let chat_id = self.ready_chat()?;
        Message::validate_content(content).map_err(|e| ClientError::Validation(e.to_string()))?;

        let nonce = Uuid::new_v4().to_string();
        self.timeline.push_pending(nonce.clone(), content, now);

        if self.local_typing.stop().is_some() {
            self.send_typing(chat_id, TypingSignalKind::Stop).await;
        }

        let event = ClientEvent::SendMessage(SendMessagePayload {
            chat_id,
            content: content.to_string(),
            nonce: Some(nonce.clone()),
        });
        if let Err(e) = self.link.send(event).await {
            self.timeline.fail(&nonce);
            return Err(e);
        }

        Ok(nonce)
    }

    /// The local user typed something
    pub async fn input(&mut self, now: Instant) -> ClientResult<()> {
        let chat_id = self.ready_chat()?;
        if self.local_typing.input(now) == Some(TypingSignalKind::Start) {
            self.send_typing(chat_id, TypingSignalKind::Start).await;
        }
        Ok(())
    }

    /// Apply one event from the relay
    pub fn handle_event(&mut self, event: ServerEvent, now: Instant) {
        if self.state == SessionState::Closed {
            return;
        }

        match event {
            ServerEvent::ReceiveMessage(message) => {
                if Some(message.chat_id) != self.chat_id {
                    return;
                }
                if message.sender_id != self.user_id {
                    self.remote_typing.stop(message.chat_id, message.sender_id);
                }
                let nonce = message.nonce.clone();
                if self.timeline.confirm(*message) == Confirmation::Recovered {
                    self.settle_recovered(nonce);
                }
            }
            ServerEvent::Error(error) => {
                let Some(nonce) = error.nonce.as_deref() else {
                    tracing::debug!(code = %error.code, message = %error.message, "Relay error");
                    return;
                };
                if let Some(pending) = self.timeline.fail(nonce) {
                    self.failures.push(SendFailure {
                        nonce: pending.nonce,
                        content: pending.content,
                        code: error.code,
                        message: error.message,
                    });
                }
            }
            ServerEvent::UserTyping(signal) => {
                if Some(signal.chat_id) == self.chat_id && signal.user_id != self.user_id {
                    self.remote_typing.start(signal.chat_id, signal.user_id, now);
                }
            }
            ServerEvent::UserStopTyping(signal) => {
                self.remote_typing.stop(signal.chat_id, signal.user_id);
            }
            ServerEvent::UserStatusChanged(status) => {
                if status.user_id == self.friend_id {
                    self.friend_online = status.is_online;
                    if !status.is_online {
                        if let Some(chat_id) = self.chat_id {
                            self.remote_typing.stop(chat_id, status.user_id);
                        }
                    }
                }
            }
            ServerEvent::OnlineUsersList(statuses) => {
                self.friend_online = statuses
                    .iter()
                    .any(|s| s.user_id == self.friend_id && s.is_online);
            }
            ServerEvent::Hello(_) | ServerEvent::HeartbeatAck => {}
        }
    }

    /// Advance timers: send timeouts, remote typing expiry, local idle stop
    pub async fn tick(&mut self, now: Instant) {
        if self.state == SessionState::Closed {
            return;
        }

        for pending in self.timeline.expire(now, self.config.send_timeout) {
            tracing::debug!(nonce = %pending.nonce, "Send timed out");
            self.failures.push(SendFailure {
                nonce: pending.nonce,
                content: pending.content,
                code: ClientError::Timeout.code().to_string(),
                message: ClientError::Timeout.to_string(),
            });
        }

        self.remote_typing.expire(now);

        if self.local_typing.poll(now) == Some(TypingSignalKind::Stop) {
            if let Some(chat_id) = self.chat_id {
                self.send_typing(chat_id, TypingSignalKind::Stop).await;
            }
        }
    }

    /// Start a fetch of the page before the oldest loaded message
    ///
    /// `None` when the session is not ready or the history is exhausted.
    pub fn begin_load_older(&mut self) -> Option<HistoryRequest> {
        let cursor = self.older_cursor?;
        self.begin_history(HistoryKind::Older, Some(cursor))
    }

    /// Start a fetch of the newest page
    pub fn begin_refresh(&mut self) -> Option<HistoryRequest> {
        self.begin_history(HistoryKind::Latest, None)
    }

    /// Apply a history result; returns how many messages were new
    ///
    /// Results for a superseded request or a closed session are ignored.
    pub fn apply_history(
        &mut self,
        request: &HistoryRequest,
        result: ClientResult<MessagePage>,
    ) -> ClientResult<usize> {
        if self.state == SessionState::Closed || self.history_in_flight != Some(request.ticket) {
            tracing::debug!(ticket = ?request.ticket, "Dropping stale history response");
            return Ok(0);
        }
        self.history_in_flight = None;

        let page = result?;
        if request.kind == HistoryKind::Older {
            self.older_cursor = page.next_cursor;
        }
        let (added, recovered) = self.timeline.merge_history(page.messages);
        self.settle_recovered(recovered);
        Ok(added)
    }

    /// Fetch and apply the next older page
    pub async fn load_older(&mut self) -> ClientResult<usize> {
        let Some(request) = self.begin_load_older() else {
            return Ok(0);
        };
        let result = self
            .backend
            .list_messages(request.chat_id, request.cursor, request.limit)
            .await;
        self.apply_history(&request, result)
    }

    /// Fetch and apply the newest page
    pub async fn refresh(&mut self) -> ClientResult<usize> {
        let Some(request) = self.begin_refresh() else {
            return Ok(0);
        };
        let result = self
            .backend
            .list_messages(request.chat_id, request.cursor, request.limit)
            .await;
        self.apply_history(&request, result)
    }

    /// Close the session; terminal
    ///
    /// Emits `typing_stop` if the user was typing, then `leave_chat`.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Some(chat_id) = self.chat_id {
            if self.local_typing.stop().is_some() {
                self.send_typing(chat_id, TypingSignalKind::Stop).await;
            }
            if let Err(e) = self.link.send(ClientEvent::LeaveChat(ChatRef { chat_id })).await {
                tracing::debug!(chat_id = %chat_id, error = %e, "Failed to leave chat");
            }
        }

        self.state = SessionState::Closed;
        self.epoch += 1;
        self.history_in_flight = None;
        self.remote_typing.clear();
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn chat_id(&self) -> Option<Snowflake> {
        self.chat_id
    }

    pub fn members(&self) -> &[UserSummary] {
        &self.members
    }

    pub fn entries(&self) -> impl Iterator<Item = TimelineEntry<'_>> {
        self.timeline.entries()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn friend_online(&self) -> bool {
        self.friend_online
    }

    pub fn is_friend_typing(&self, now: Instant) -> bool {
        self.chat_id
            .is_some_and(|chat_id| self.remote_typing.is_typing(chat_id, self.friend_id, now))
    }

    pub fn is_typing(&self) -> bool {
        self.local_typing.is_typing()
    }

    pub fn has_older(&self) -> bool {
        self.older_cursor.is_some()
    }

    /// Drain sends rolled back since the last call
    pub fn take_failures(&mut self) -> Vec<SendFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Drain nonces of timed-out sends, already handed out by
    /// [`take_failures`](Self::take_failures), that were persisted after all
    pub fn take_recovered(&mut self) -> Vec<String> {
        std::mem::take(&mut self.recovered)
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    fn ready_chat(&self) -> ClientResult<Snowflake> {
        match (&self.state, self.chat_id) {
            (SessionState::Ready, Some(chat_id)) => Ok(chat_id),
            (state, _) => Err(ClientError::InvalidState(state.name())),
        }
    }

    /// A timed-out send was persisted: withdraw its failure, or report the
    /// recovery when the failure was already drained
    fn settle_recovered(&mut self, nonces: impl IntoIterator<Item = String>) {
        for nonce in nonces {
            tracing::debug!(nonce = %nonce, "Timed-out send was confirmed late");
            match self.failures.iter().position(|f| f.nonce == nonce) {
                Some(index) => {
                    self.failures.remove(index);
                }
                None => self.recovered.push(nonce),
            }
        }
    }

    fn fail_open(&mut self, error: ClientError) -> ClientError {
        tracing::warn!(friend_id = %self.friend_id, error = %error, "Failed to open chat");
        self.state = SessionState::from_error(&error);
        error
    }

    fn begin_history(
        &mut self,
        kind: HistoryKind,
        cursor: Option<Snowflake>,
    ) -> Option<HistoryRequest> {
        let chat_id = self.ready_chat().ok()?;
        self.next_seq += 1;
        let ticket = Ticket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.history_in_flight = Some(ticket);
        Some(HistoryRequest {
            ticket,
            kind,
            chat_id,
            cursor,
            limit: self.config.page_size,
        })
    }

    async fn send_typing(&self, chat_id: Snowflake, kind: TypingSignalKind) {
        let payload = TypingPayload {
            chat_id,
            user_id: Some(self.user_id),
        };
        let event = match kind {
            TypingSignalKind::Start => ClientEvent::TypingStart(payload),
            TypingSignalKind::Stop => ClientEvent::TypingStop(payload),
        };
        if let Err(e) = self.link.send(event).await {
            tracing::debug!(chat_id = %chat_id, error = %e, "Failed to send typing signal");
        }
    }
}
