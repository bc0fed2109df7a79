//! Shared fixtures for service tests

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::entities::{Friendship, User};
use chat_core::traits::{RepoResult, UserRepository};
use chat_core::{DomainError, Snowflake, SnowflakeGenerator};
use chat_db::MemoryStore;

use super::context::ServiceContext;

pub struct Fixture {
    pub ctx: ServiceContext,
    pub store: MemoryStore,
    pub alice: Snowflake,
    pub bob: Snowflake,
    /// Known user with no friendships
    pub carol: Snowflake,
}

/// Alice and Bob are friends; Carol knows nobody
pub fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let (alice, bob, carol) = (Snowflake::new(1), Snowflake::new(2), Snowflake::new(3));
    store.insert_user(User::new(alice, "alice"));
    store.insert_user(User::new(bob, "bob"));
    store.insert_user(User::new(carol, "carol"));
    store.add_friendship(&Friendship::new(alice, bob));

    let ctx = ServiceContext::memory(&store, Arc::new(SnowflakeGenerator::new(1)));
    Fixture {
        ctx,
        store,
        alice,
        bob,
        carol,
    }
}

/// User lookups that always fail as if storage were down
pub struct UnavailableUsers;

#[async_trait]
impl UserRepository for UnavailableUsers {
    async fn find_by_id(&self, _id: Snowflake) -> RepoResult<Option<User>> {
        Err(DomainError::DatabaseError("users unavailable".to_string()))
    }

    async fn find_many(&self, _ids: &[Snowflake]) -> RepoResult<Vec<User>> {
        Err(DomainError::DatabaseError("users unavailable".to_string()))
    }
}
