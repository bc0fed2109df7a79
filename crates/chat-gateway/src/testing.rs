//! Shared fixtures for gateway tests

use std::sync::Arc;

use chat_common::AppConfig;
use chat_core::entities::{Friendship, User};
use chat_core::protocol::ServerEvent;
use chat_core::{Snowflake, SnowflakeGenerator};
use chat_db::MemoryStore;
use chat_service::{ChatService, ServiceContext};
use tokio::sync::mpsc;

use crate::connection::{Connection, ConnectionManager};
use crate::relay::{MessageRelay, TypingBroadcaster};
use crate::rooms::RoomManager;
use crate::server::GatewayState;

/// Alice and Bob are friends with a chat between them; Carol is a stranger.
/// Each has one identified connection.
pub struct RelayFixture {
    pub store: MemoryStore,
    pub connections: Arc<ConnectionManager>,
    pub rooms: Arc<RoomManager>,
    pub relay: MessageRelay,
    pub typing: TypingBroadcaster,
    pub alice: Snowflake,
    pub bob: Snowflake,
    pub chat_id: Snowflake,
    pub alice_conn: Arc<Connection>,
    pub alice_rx: mpsc::Receiver<ServerEvent>,
    pub bob_conn: Arc<Connection>,
    pub bob_rx: mpsc::Receiver<ServerEvent>,
    pub carol_conn: Arc<Connection>,
}

impl RelayFixture {
    pub fn join_both(&self) {
        self.rooms.join(self.alice_conn.id(), self.chat_id);
        self.rooms.join(self.bob_conn.id(), self.chat_id);
    }
}

/// A store seeded with Alice, Bob and Carol, where only Alice and Bob are friends
pub fn seeded_store() -> (MemoryStore, Snowflake, Snowflake, Snowflake) {
    let store = MemoryStore::new();
    let (alice, bob, carol) = (Snowflake::new(1), Snowflake::new(2), Snowflake::new(3));
    store.insert_user(User::new(alice, "alice"));
    store.insert_user(User::new(bob, "bob"));
    store.insert_user(User::new(carol, "carol"));
    store.add_friendship(&Friendship::new(alice, bob));
    (store, alice, bob, carol)
}

pub async fn relay_fixture() -> RelayFixture {
    let (store, alice, bob, carol) = seeded_store();
    let ctx = Arc::new(ServiceContext::memory(
        &store,
        Arc::new(SnowflakeGenerator::new(1)),
    ));
    let chat_id = ChatService::new(&ctx)
        .get_or_create_chat(alice, bob)
        .await
        .unwrap()
        .id;

    let connections = ConnectionManager::new_shared();
    let rooms = Arc::new(RoomManager::new());
    let relay = MessageRelay::new(Arc::clone(&ctx), Arc::clone(&connections), Arc::clone(&rooms));
    let typing = TypingBroadcaster::new(Arc::clone(&connections), Arc::clone(&rooms));

    let connect = |user_id: Snowflake| {
        let (tx, rx) = mpsc::channel(64);
        let conn = connections.add_connection(tx);
        conn.bind_user(user_id);
        (conn, rx)
    };
    let (alice_conn, alice_rx) = connect(alice);
    let (bob_conn, bob_rx) = connect(bob);
    let (carol_conn, _carol_rx) = connect(carol);

    RelayFixture {
        store,
        connections,
        rooms,
        relay,
        typing,
        alice,
        bob,
        chat_id,
        alice_conn,
        alice_rx,
        bob_conn,
        bob_rx,
        carol_conn,
    }
}

/// A gateway over the seeded store with no connections yet
pub struct GatewayFixture {
    pub state: GatewayState,
    pub alice: Snowflake,
    pub bob: Snowflake,
    pub carol: Snowflake,
}

impl GatewayFixture {
    /// Open the Alice/Bob chat
    pub async fn open_chat(&self) -> Snowflake {
        ChatService::new(self.state.service_context())
            .get_or_create_chat(self.alice, self.bob)
            .await
            .unwrap()
            .id
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|_| None).unwrap()
}

pub fn gateway_fixture() -> GatewayFixture {
    let (store, alice, bob, carol) = seeded_store();
    let ctx = ServiceContext::memory(&store, Arc::new(SnowflakeGenerator::new(1)));

    GatewayFixture {
        state: GatewayState::new(ctx, test_config()),
        alice,
        bob,
        carol,
    }
}
