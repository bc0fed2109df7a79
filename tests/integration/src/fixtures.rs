//! Test fixtures and data generators
//!
//! Every server starts from the same cast: Alice and Bob are friends, Carol
//! knows nobody.

use chat_core::entities::{Friendship, User};
use chat_core::protocol::{
    ChatRef, ClientEvent, SendMessagePayload, TypingPayload, UserInfo, UserOnlinePayload,
};
use chat_core::Snowflake;
use chat_db::MemoryStore;
use serde::Serialize;

pub const ALICE: Snowflake = Snowflake::new(1001);
pub const BOB: Snowflake = Snowflake::new(1002);
pub const CAROL: Snowflake = Snowflake::new(1003);

/// A store seeded with the cast
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_user(User::new(ALICE, "alice"));
    store.insert_user(User::new(BOB, "bob"));
    store.insert_user(User::new(CAROL, "carol"));
    store.add_friendship(&Friendship::new(ALICE, BOB));
    store
}

/// Body of `POST /chats`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChatRequest {
    pub friend_id: Snowflake,
}

impl OpenChatRequest {
    pub fn with(friend_id: Snowflake) -> Self {
        Self { friend_id }
    }
}

pub fn user_online(user_id: Snowflake, name: &str) -> ClientEvent {
    ClientEvent::UserOnline(UserOnlinePayload {
        user_id,
        user_info: Some(UserInfo {
            name: Some(name.to_string()),
            image: None,
        }),
    })
}

pub fn join_chat(chat_id: Snowflake) -> ClientEvent {
    ClientEvent::JoinChat(ChatRef { chat_id })
}

pub fn send_message(chat_id: Snowflake, content: &str, nonce: &str) -> ClientEvent {
    ClientEvent::SendMessage(SendMessagePayload {
        chat_id,
        content: content.to_string(),
        nonce: Some(nonce.to_string()),
    })
}

pub fn typing_start(chat_id: Snowflake) -> ClientEvent {
    ClientEvent::TypingStart(TypingPayload {
        chat_id,
        user_id: None,
    })
}
