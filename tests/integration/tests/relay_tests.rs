//! Relay integration tests
//!
//! Raw WebSocket clients against an in-process gateway over the in-memory
//! store.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use chat_core::protocol::{ChatResponse, MessagePage, PresenceStatus, ServerEvent};
use chat_core::Snowflake;
use integration_tests::{
    assert_json, config_from, eventually, fixtures::*, Closed, TestServer, WsClient,
};
use reqwest::StatusCode;

const QUIET: Duration = Duration::from_millis(300);

async fn open_chat(server: &TestServer) -> Snowflake {
    let response = server
        .post_as("/chats", ALICE, &OpenChatRequest::with(BOB))
        .await
        .unwrap();
    let chat: ChatResponse = assert_json(response, StatusCode::OK).await.unwrap();
    chat.id
}

/// Online, joined, and synced
async fn member(
    server: &TestServer,
    user_id: Snowflake,
    name: &str,
    chat_id: Snowflake,
) -> WsClient {
    let mut client = server.connect().await.unwrap();
    client.go_online(user_id, name).await.unwrap();
    client.send(&join_chat(chat_id)).await.unwrap();
    client.sync().await.unwrap();
    client
}

async fn history(server: &TestServer, chat_id: Snowflake, user_id: Snowflake) -> MessagePage {
    let response = server
        .get_as(&format!("/chats/{chat_id}/messages"), user_id)
        .await
        .unwrap();
    assert_json(response, StatusCode::OK).await.unwrap()
}

fn is_message(event: &ServerEvent) -> bool {
    matches!(event, ServerEvent::ReceiveMessage(_))
}

fn status_of(user_id: Snowflake) -> impl Fn(&ServerEvent) -> bool {
    move |event| matches!(event, ServerEvent::UserStatusChanged(s) if s.user_id == user_id)
}

async fn is_online(server: &TestServer, user_id: Snowflake) -> bool {
    let response = server
        .get(&format!("/users/{user_id}/presence"))
        .await
        .unwrap();
    let status: PresenceStatus = assert_json(response, StatusCode::OK).await.unwrap();
    status.is_online
}

// ============================================================================
// Messaging
// ============================================================================

#[tokio::test]
async fn test_friends_exchange_hi() {
    let server = TestServer::start().await.unwrap();
    let chat_id = open_chat(&server).await;

    let mut alice = member(&server, ALICE, "alice", chat_id).await;
    let mut bob = member(&server, BOB, "bob", chat_id).await;

    alice.send(&send_message(chat_id, "hi", "n-1")).await.unwrap();

    let ServerEvent::ReceiveMessage(received) = bob.expect(is_message).await.unwrap() else {
        unreachable!()
    };
    assert_eq!(received.content, "hi");
    assert_eq!(received.sender_id, ALICE);
    assert_eq!(received.sender.name.as_deref(), Some("alice"));

    let ServerEvent::ReceiveMessage(confirmed) = alice.expect(is_message).await.unwrap() else {
        unreachable!()
    };
    assert_eq!(confirmed.id, received.id);
    assert_eq!(confirmed.nonce.as_deref(), Some("n-1"));

    for user in [ALICE, BOB] {
        let page = history(&server, chat_id, user).await;
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].content, "hi");
        assert_eq!(page.messages[0].sender_id, ALICE);
    }
}

#[tokio::test]
async fn test_tampered_chat_id_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let chat_id = open_chat(&server).await;
    let mut bob = member(&server, BOB, "bob", chat_id).await;

    let mut carol = server.connect().await.unwrap();
    carol.go_online(CAROL, "carol").await.unwrap();
    carol.send(&send_message(chat_id, "let me in", "n-x")).await.unwrap();

    let ServerEvent::Error(error) = carol
        .expect(|e| matches!(e, ServerEvent::Error(_)))
        .await
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(error.code, "AUTHORIZATION_ERROR");
    assert_eq!(error.nonce.as_deref(), Some("n-x"));
    assert_eq!(error.chat_id, Some(chat_id));

    bob.expect_none(is_message, QUIET).await.unwrap();
    assert_eq!(server.store.message_count(chat_id), 0);
}

#[tokio::test]
async fn test_joining_twice_delivers_once() {
    let server = TestServer::start().await.unwrap();
    let chat_id = open_chat(&server).await;

    let mut alice = member(&server, ALICE, "alice", chat_id).await;
    let mut bob = member(&server, BOB, "bob", chat_id).await;
    bob.send(&join_chat(chat_id)).await.unwrap();
    bob.sync().await.unwrap();

    alice.send(&send_message(chat_id, "once", "n-1")).await.unwrap();

    bob.expect(is_message).await.unwrap();
    bob.expect_none(is_message, QUIET).await.unwrap();
}

#[tokio::test]
async fn test_broadcast_order_matches_storage_order() {
    let server = TestServer::start().await.unwrap();
    let chat_id = open_chat(&server).await;

    let mut alice = member(&server, ALICE, "alice", chat_id).await;
    let mut bob = member(&server, BOB, "bob", chat_id).await;

    for i in 0..10 {
        alice
            .send(&send_message(chat_id, &format!("a{i}"), &format!("a-{i}")))
            .await
            .unwrap();
        bob.send(&send_message(chat_id, &format!("b{i}"), &format!("b-{i}")))
            .await
            .unwrap();
    }

    let mut seen_by_bob = Vec::new();
    while seen_by_bob.len() < 20 {
        if let ServerEvent::ReceiveMessage(m) = bob.expect(is_message).await.unwrap() {
            seen_by_bob.push(m.id);
        }
    }
    let mut seen_by_alice = Vec::new();
    while seen_by_alice.len() < 20 {
        if let ServerEvent::ReceiveMessage(m) = alice.expect(is_message).await.unwrap() {
            seen_by_alice.push(m.id);
        }
    }

    let stored: Vec<_> = history(&server, chat_id, ALICE)
        .await
        .messages
        .into_iter()
        .map(|m| m.id)
        .collect();

    assert_eq!(seen_by_bob, stored);
    assert_eq!(seen_by_alice, stored);
}

#[tokio::test]
async fn test_persistence_failure_reaches_sender_only() {
    let server = TestServer::start().await.unwrap();
    let chat_id = open_chat(&server).await;

    let mut alice = member(&server, ALICE, "alice", chat_id).await;
    let mut bob = member(&server, BOB, "bob", chat_id).await;

    server.store.set_unavailable(true);
    alice.send(&send_message(chat_id, "lost", "n-1")).await.unwrap();

    let ServerEvent::Error(error) = alice
        .expect(|e| matches!(e, ServerEvent::Error(_)))
        .await
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(error.code, "PERSISTENCE_ERROR");
    assert_eq!(error.nonce.as_deref(), Some("n-1"));

    bob.expect_none(is_message, QUIET).await.unwrap();

    server.store.set_unavailable(false);
    assert_eq!(server.store.message_count(chat_id), 0);
}

// ============================================================================
// Typing
// ============================================================================

#[tokio::test]
async fn test_typing_reaches_friend_and_clears_on_disconnect() {
    let server = TestServer::start().await.unwrap();
    let chat_id = open_chat(&server).await;

    let mut alice = member(&server, ALICE, "alice", chat_id).await;
    let mut bob = member(&server, BOB, "bob", chat_id).await;

    alice.send(&typing_start(chat_id)).await.unwrap();
    let ServerEvent::UserTyping(signal) = bob
        .expect(|e| matches!(e, ServerEvent::UserTyping(_)))
        .await
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(signal.user_id, ALICE);
    assert_eq!(signal.chat_id, chat_id);

    alice.close().await.unwrap();

    let ServerEvent::UserStopTyping(signal) = bob
        .expect(|e| matches!(e, ServerEvent::UserStopTyping(_)))
        .await
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(signal.user_id, ALICE);
}

#[tokio::test]
async fn test_typing_for_another_user_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let chat_id = open_chat(&server).await;
    let mut alice = member(&server, ALICE, "alice", chat_id).await;

    alice
        .send_text(&format!(
            r#"{{"event":"typing_start","data":{{"chatId":"{chat_id}","userId":"{BOB}"}}}}"#
        ))
        .await
        .unwrap();

    let ServerEvent::Error(error) = alice
        .expect(|e| matches!(e, ServerEvent::Error(_)))
        .await
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(error.code, "AUTHORIZATION_ERROR");
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_reconnect_emits_one_transition_each_way() {
    let server = TestServer::start().await.unwrap();

    let mut bob = server.connect().await.unwrap();
    bob.go_online(BOB, "bob").await.unwrap();

    let mut first = server.connect().await.unwrap();
    let snapshot = first.go_online(ALICE, "alice").await.unwrap();
    assert!(snapshot.iter().any(|s| s.user_id == BOB && s.is_online));

    let ServerEvent::UserStatusChanged(status) = bob.expect(status_of(ALICE)).await.unwrap() else {
        unreachable!()
    };
    assert!(status.is_online);

    let mut second = server.connect().await.unwrap();
    second.go_online(ALICE, "alice").await.unwrap();
    bob.expect_none(status_of(ALICE), QUIET).await.unwrap();

    first.close().await.unwrap();
    bob.expect_none(status_of(ALICE), QUIET).await.unwrap();
    assert!(is_online(&server, ALICE).await);

    second.close().await.unwrap();
    let ServerEvent::UserStatusChanged(status) = bob.expect(status_of(ALICE)).await.unwrap() else {
        unreachable!()
    };
    assert!(!status.is_online);
    assert!(!is_online(&server, ALICE).await);
}

#[tokio::test]
async fn test_connection_cannot_switch_user() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    client.go_online(ALICE, "alice").await.unwrap();

    client.send(&user_online(BOB, "bob")).await.unwrap();

    let ServerEvent::Error(error) = client
        .expect(|e| matches!(e, ServerEvent::Error(_)))
        .await
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(error.code, "VALIDATION_ERROR");
    assert!(!is_online(&server, BOB).await);
}

// ============================================================================
// Protocol
// ============================================================================

#[tokio::test]
async fn test_hello_and_heartbeat() {
    let config = config_from(&[
        ("HEARTBEAT_INTERVAL_MS", "1500"),
        ("HEARTBEAT_TIMEOUT_MS", "4000"),
    ])
    .unwrap();
    let server = TestServer::start_with_config(config).await.unwrap();

    let mut client = WsClient::connect(&server.gateway_url()).await.unwrap();
    let event = client.recv().await.unwrap();
    let ServerEvent::Hello(hello) = &event else {
        panic!("expected hello, got {event:?}");
    };
    assert_eq!(hello.heartbeat_interval, 1500);

    client.sync().await.unwrap();
}

#[tokio::test]
async fn test_silent_connection_times_out() {
    let server = TestServer::start_with_config(
        config_from(&[("HEARTBEAT_INTERVAL_MS", "100"), ("HEARTBEAT_TIMEOUT_MS", "300")]).unwrap(),
    )
    .await
    .unwrap();

    let mut client = server.connect().await.unwrap();
    client.go_online(ALICE, "alice").await.unwrap();

    assert_eq!(client.closed().await.unwrap(), Closed::Code(4009));
    let server = &server;
    eventually(|| async move { Ok(!is_online(server, ALICE).await) })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_garbage_frame_closes_with_decode_error() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client.send_text("not json").await.unwrap();

    assert_eq!(client.closed().await.unwrap(), Closed::Code(4002));
}

#[tokio::test]
async fn test_unknown_event_closes() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();

    client
        .send_text(r#"{"event":"identify","data":{}}"#)
        .await
        .unwrap();

    assert_eq!(client.closed().await.unwrap(), Closed::Code(4001));
}

#[tokio::test]
async fn test_bad_payload_is_reported_and_connection_stays_open() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    client.go_online(ALICE, "alice").await.unwrap();

    client
        .send_text(r#"{"event":"send_message","data":{"chatId":"42","nonce":"n-9"}}"#)
        .await
        .unwrap();

    let ServerEvent::Error(error) = client
        .expect(|e| matches!(e, ServerEvent::Error(_)))
        .await
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(error.code, "VALIDATION_ERROR");
    assert_eq!(error.nonce.as_deref(), Some("n-9"));
    assert_eq!(error.chat_id, Some(Snowflake::new(42)));

    client.sync().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_open_sockets() {
    let mut server = TestServer::start().await.unwrap();
    let mut client = server.connect().await.unwrap();
    client.go_online(ALICE, "alice").await.unwrap();

    server.shutdown();

    client.closed().await.unwrap();
}
