//! In-memory storage
//!
//! Implements every repository trait over a single lock-protected state so the
//! gateway runs without PostgreSQL (development, tests). Enforces the same
//! constraints as the schema: one chat per member pair, messages only in
//! existing chats, chats only between existing users.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::instrument;

use chat_core::entities::{Chat, Friendship, MemberPair, Message, User};
use chat_core::error::DomainError;
use chat_core::traits::{
    ChatRepository, FriendshipRepository, MessageQuery, MessageRepository, RepoResult,
    UserRepository,
};
use chat_core::value_objects::Snowflake;

#[derive(Default)]
struct State {
    users: HashMap<Snowflake, User>,
    friendships: HashSet<(Snowflake, Snowflake)>,
    chats: HashMap<Snowflake, Chat>,
    pairs: HashMap<MemberPair, Snowflake>,
    messages: HashMap<Snowflake, BTreeMap<Snowflake, Message>>,
}

/// Shared in-memory store; clones share state
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub fn insert_user(&self, user: User) {
        self.state.write().users.insert(user.id, user);
    }

    /// Record a friendship in both directions
    pub fn add_friendship(&self, friendship: &Friendship) {
        let mut state = self.state.write();
        state
            .friendships
            .insert((friendship.user_id, friendship.friend_id));
        state
            .friendships
            .insert((friendship.friend_id, friendship.user_id));
    }

    /// Make every operation fail with a database error until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn message_count(&self, chat_id: Snowflake) -> usize {
        self.state
            .read()
            .messages
            .get(&chat_id)
            .map_or(0, BTreeMap::len)
    }

    fn check_available(&self) -> RepoResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError(
                "storage is unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>> {
        self.check_available()?;
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Snowflake]) -> RepoResult<Vec<User>> {
        self.check_available()?;
        let state = self.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl FriendshipRepository for MemoryStore {
    async fn exists(&self, a: Snowflake, b: Snowflake) -> RepoResult<bool> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state.friendships.contains(&(a, b)) || state.friendships.contains(&(b, a)))
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Chat>> {
        self.check_available()?;
        Ok(self.state.read().chats.get(&id).cloned())
    }

    async fn find_direct(&self, pair: MemberPair) -> RepoResult<Option<Chat>> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .pairs
            .get(&pair)
            .and_then(|id| state.chats.get(id))
            .cloned())
    }

    #[instrument(skip(self, chat), fields(chat_id = %chat.id))]
    async fn create_direct(&self, chat: &Chat) -> RepoResult<Chat> {
        self.check_available()?;
        let mut state = self.state.write();

        if let Some(existing) = state.pairs.get(&chat.members) {
            let existing = *existing;
            return state
                .chats
                .get(&existing)
                .cloned()
                .ok_or_else(|| DomainError::InternalError("dangling chat pair".to_string()));
        }
        for member in chat.member_ids() {
            if !state.users.contains_key(&member) {
                return Err(DomainError::UserNotFound(member));
            }
        }

        state.pairs.insert(chat.members, chat.id);
        state.chats.insert(chat.id, chat.clone());
        Ok(chat.clone())
    }

    async fn is_member(&self, chat_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .chats
            .get(&chat_id)
            .is_some_and(|chat| chat.is_member(user_id)))
    }

    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Vec<Chat>> {
        self.check_available()?;
        let mut chats: Vec<Chat> = self
            .state
            .read()
            .chats
            .values()
            .filter(|chat| chat.is_member(user_id))
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(chats)
    }

    async fn touch(&self, chat_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        self.check_available()?;
        let mut state = self.state.write();
        let chat = state
            .chats
            .get_mut(&chat_id)
            .ok_or(DomainError::ChatNotFound(chat_id))?;
        chat.touch(at);
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    #[instrument(skip(self, message), fields(message_id = %message.id, chat_id = %message.chat_id))]
    async fn create(&self, message: &Message) -> RepoResult<()> {
        self.check_available()?;
        let mut state = self.state.write();
        if !state.chats.contains_key(&message.chat_id) {
            return Err(DomainError::ChatNotFound(message.chat_id));
        }
        state
            .messages
            .entry(message.chat_id)
            .or_default()
            .insert(message.id, message.clone());
        Ok(())
    }

    async fn find_by_chat(
        &self,
        chat_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        self.check_available()?;
        let limit = usize::try_from(query.limit.clamp(1, 100)).unwrap_or(1);
        let state = self.state.read();
        let Some(messages) = state.messages.get(&chat_id) else {
            return Ok(Vec::new());
        };

        let newest_first: Box<dyn Iterator<Item = &Message>> = match query.before {
            Some(before) => Box::new(messages.range(..before).rev().map(|(_, m)| m)),
            None => Box::new(messages.values().rev()),
        };
        Ok(newest_first.take(limit).cloned().collect())
    }

    async fn latest(&self, chat_id: Snowflake) -> RepoResult<Option<Message>> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .messages
            .get(&chat_id)
            .and_then(|messages| messages.values().next_back())
            .cloned())
    }
}
