//! Chat session client against a live gateway
//!
//! Run with: cargo test -p integration-tests --test session_tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use chat_client::{
    ChatSession, HttpChatBackend, SessionConfig, SessionState, WsRelayLink,
};
use chat_core::protocol::{ServerEvent, UserInfo, UserOnlinePayload};
use chat_core::{Snowflake, SnowflakeGenerator};
use chat_service::{MessageService, ServiceContext};
use integration_tests::{fixtures::*, TestServer, EVENT_TIMEOUT};
use tokio::sync::mpsc;

type LiveSession = ChatSession<HttpChatBackend, WsRelayLink>;

struct Peer {
    session: LiveSession,
    events: mpsc::Receiver<ServerEvent>,
}

impl Peer {
    async fn connect(
        server: &TestServer,
        user_id: Snowflake,
        name: &str,
        friend_id: Snowflake,
    ) -> Self {
        let announce = UserOnlinePayload {
            user_id,
            user_info: Some(UserInfo {
                name: Some(name.to_string()),
                image: None,
            }),
        };
        let (link, events) = WsRelayLink::connect(&server.gateway_url(), announce)
            .await
            .unwrap();
        let backend = HttpChatBackend::new(server.base_url(), user_id).unwrap();
        let session = ChatSession::new(backend, link, user_id, friend_id, SessionConfig::default());
        Self { session, events }
    }

    async fn open(
        server: &TestServer,
        user_id: Snowflake,
        name: &str,
        friend_id: Snowflake,
    ) -> Self {
        let mut peer = Self::connect(server, user_id, name, friend_id).await;
        peer.session.open().await.unwrap();
        assert_eq!(peer.session.state(), &SessionState::Ready);
        peer
    }

    /// Feed relay events into the session until `done` holds
    async fn pump_until(&mut self, done: impl Fn(&LiveSession) -> bool) {
        while !done(&self.session) {
            let event = tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
                .await
                .expect("timed out waiting for relay event")
                .expect("relay connection closed");
            self.session.handle_event(event, Instant::now());
        }
    }
}

/// Both sessions open and joined, each seen typing by the other
async fn open_pair(server: &TestServer) -> (Peer, Peer) {
    let mut alice = Peer::open(server, ALICE, "alice", BOB).await;
    let mut bob = Peer::open(server, BOB, "bob", ALICE).await;
    let chat_id = alice.session.chat_id().unwrap();
    assert_eq!(bob.session.chat_id(), Some(chat_id));
    server.wait_for_room(chat_id, 2).await.unwrap();

    bob.session.input(Instant::now()).await.unwrap();
    alice.pump_until(|s| s.is_friend_typing(Instant::now())).await;
    alice.session.input(Instant::now()).await.unwrap();
    bob.pump_until(|s| s.is_friend_typing(Instant::now())).await;

    (alice, bob)
}

#[tokio::test]
async fn test_sessions_exchange_message() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, mut bob) = open_pair(&server).await;

    let nonce = alice.session.send("hi", Instant::now()).await.unwrap();
    assert!(alice.session.timeline().is_pending(&nonce));

    alice
        .pump_until(|s| !s.timeline().is_pending(&nonce))
        .await;
    bob.pump_until(|s| s.timeline().confirmed_len() == 1).await;

    let mine: Vec<_> = alice
        .session
        .entries()
        .map(|e| (e.content().to_string(), e.is_pending()))
        .collect();
    assert_eq!(mine, [("hi".to_string(), false)]);

    let theirs: Vec<_> = bob.session.entries().map(|e| e.content().to_string()).collect();
    assert_eq!(theirs, ["hi"]);
    // A message from Alice ends her typing indicator on Bob's side
    assert!(!bob.session.is_friend_typing(Instant::now()));
}

#[tokio::test]
async fn test_closing_session_clears_friend_typing() {
    let server = TestServer::start().await.unwrap();
    let (mut alice, mut bob) = open_pair(&server).await;
    assert!(bob.session.is_friend_typing(Instant::now()));

    alice.session.close().await;
    assert_eq!(alice.session.state(), &SessionState::Closed);

    bob.pump_until(|s| !s.is_friend_typing(Instant::now())).await;
}

#[tokio::test]
async fn test_watchdog_clears_typing_without_stop() {
    let server = TestServer::start().await.unwrap();
    let mut bob = Peer::open(&server, BOB, "bob", ALICE).await;
    let chat_id = bob.session.chat_id().unwrap();
    server.wait_for_room(chat_id, 1).await.unwrap();

    // A raw client that never sends typing_stop
    let mut alice = server.connect().await.unwrap();
    alice.go_online(ALICE, "alice").await.unwrap();
    alice.send(&join_chat(chat_id)).await.unwrap();
    alice.send(&typing_start(chat_id)).await.unwrap();

    bob.pump_until(|s| s.is_friend_typing(Instant::now())).await;
    let seen_at = Instant::now();

    bob.session.tick(seen_at + Duration::from_millis(1500)).await;
    assert!(bob.session.is_friend_typing(seen_at + Duration::from_millis(1500)));

    bob.session.tick(seen_at + Duration::from_millis(2100)).await;
    assert!(!bob.session.is_friend_typing(seen_at + Duration::from_millis(2100)));
}

#[tokio::test]
async fn test_failed_send_leaves_no_pending_entry() {
    let server = TestServer::start().await.unwrap();
    let mut alice = Peer::open(&server, ALICE, "alice", BOB).await;

    server.store.set_unavailable(true);
    let nonce = alice.session.send("lost", Instant::now()).await.unwrap();
    alice
        .pump_until(|s| !s.timeline().is_pending(&nonce))
        .await;

    let failures = alice.session.take_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].nonce, nonce);
    assert_eq!(failures[0].code, "PERSISTENCE_ERROR");
    assert_eq!(alice.session.entries().count(), 0);
    assert_eq!(alice.session.state(), &SessionState::Ready);
}

#[tokio::test]
async fn test_open_fails_for_strangers_and_retry_stays_errored() {
    let server = TestServer::start().await.unwrap();
    let mut carol = Peer::connect(&server, CAROL, "carol", ALICE).await;

    let err = carol.session.open().await.unwrap_err();
    assert_eq!(err.code(), "AUTHORIZATION_ERROR");
    assert!(matches!(
        carol.session.state(),
        SessionState::Errored { retryable: false, .. }
    ));

    assert!(carol.session.retry().await.is_err());
    assert_eq!(carol.session.state().name(), "errored");
}

#[tokio::test]
async fn test_history_paging() {
    let server = TestServer::start().await.unwrap();
    let alice = Peer::open(&server, ALICE, "alice", BOB).await;
    let chat_id = alice.session.chat_id().unwrap();
    drop(alice);

    let ctx = ServiceContext::memory(&server.store, Arc::new(SnowflakeGenerator::new(2)));
    for i in 0..60 {
        MessageService::new(&ctx)
            .create_message(chat_id, BOB, format!("m{i}"), None)
            .await
            .unwrap();
    }

    let mut alice = Peer::open(&server, ALICE, "alice", BOB).await;
    assert_eq!(alice.session.timeline().confirmed_len(), 50);
    assert!(alice.session.has_older());

    assert_eq!(alice.session.load_older().await.unwrap(), 10);
    assert!(!alice.session.has_older());

    let contents: Vec<_> = alice.session.entries().map(|e| e.content().to_string()).collect();
    let expected: Vec<_> = (0..60).map(|i| format!("m{i}")).collect();
    assert_eq!(contents, expected);
}

#[tokio::test]
async fn test_friend_presence_follows_connection() {
    let server = TestServer::start().await.unwrap();
    let mut bob = Peer::open(&server, BOB, "bob", ALICE).await;
    assert!(!bob.session.friend_online());

    let alice = Peer::connect(&server, ALICE, "alice", BOB).await;
    bob.pump_until(LiveSession::friend_online).await;

    drop(alice);
    bob.pump_until(|s| !s.friend_online()).await;
}
