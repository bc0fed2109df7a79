//! Fakes shared by the unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chat_core::protocol::{ChatResponse, ClientEvent, MessagePage, MessagePayload};
use chat_core::{Snowflake, UserSummary};
use chrono::Utc;

use crate::error::{ClientError, ClientResult};
use crate::transport::{ChatBackend, RelayLink};

pub const CHAT: Snowflake = Snowflake::new(100);
pub const ME: Snowflake = Snowflake::new(1);
pub const FRIEND: Snowflake = Snowflake::new(2);

/// A persisted message in [`CHAT`] sent by [`FRIEND`]
pub fn message(id: i64, content: &str, nonce: Option<&str>) -> MessagePayload {
    message_from(FRIEND, id, content, nonce)
}

pub fn message_from(
    sender: Snowflake,
    id: i64,
    content: &str,
    nonce: Option<&str>,
) -> MessagePayload {
    MessagePayload {
        id: Snowflake::new(id),
        chat_id: CHAT,
        sender_id: sender,
        content: content.to_string(),
        nonce: nonce.map(str::to_string),
        created_at: Utc::now(),
        sender: UserSummary::unknown(sender),
    }
}

pub fn chat_response(messages: Vec<MessagePayload>) -> ChatResponse {
    let now = Utc::now();
    ChatResponse {
        id: CHAT,
        members: vec![UserSummary::unknown(ME), UserSummary::unknown(FRIEND)],
        messages,
        created_at: now,
        updated_at: now,
    }
}

/// Backend answering from queued results
#[derive(Default, Clone)]
pub struct FakeBackend {
    opens: Arc<Mutex<VecDeque<ClientResult<ChatResponse>>>>,
    pages: Arc<Mutex<VecDeque<ClientResult<MessagePage>>>>,
    history_calls: Arc<Mutex<Vec<(Snowflake, Option<Snowflake>, i64)>>>,
}

impl FakeBackend {
    pub fn opening(response: ChatResponse) -> Self {
        let backend = Self::default();
        backend.push_open(Ok(response));
        backend
    }

    pub fn push_open(&self, result: ClientResult<ChatResponse>) {
        self.opens.lock().unwrap().push_back(result);
    }

    pub fn push_page(&self, result: ClientResult<MessagePage>) {
        self.pages.lock().unwrap().push_back(result);
    }

    pub fn history_calls(&self) -> Vec<(Snowflake, Option<Snowflake>, i64)> {
        self.history_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn get_or_create_chat(&self, _friend_id: Snowflake) -> ClientResult<ChatResponse> {
        self.opens
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ClientError::Transport("no response queued".into())))
    }

    async fn list_messages(
        &self,
        chat_id: Snowflake,
        cursor: Option<Snowflake>,
        limit: i64,
    ) -> ClientResult<MessagePage> {
        self.history_calls.lock().unwrap().push((chat_id, cursor, limit));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ClientError::Transport("no page queued".into())))
    }
}

/// Link recording every event it is asked to send
#[derive(Default, Clone)]
pub struct RecordingLink {
    sent: Arc<Mutex<Vec<ClientEvent>>>,
    broken: Arc<AtomicBool>,
}

impl RecordingLink {
    pub fn sent(&self) -> Vec<ClientEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sent().iter().map(ClientEvent::name).collect()
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

#[async_trait]
impl RelayLink for RecordingLink {
    async fn send(&self, event: ClientEvent) -> ClientResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(ClientError::Disconnected);
        }
        self.sent.lock().unwrap().push(event);
        Ok(())
    }
}
