//! REST integration tests
//!
//! Run with: cargo test -p integration-tests --test api_tests

use chat_core::protocol::{ChatResponse, ChatSummaryResponse, MessagePage, PresenceStatus};
use integration_tests::{assert_error, assert_json, fixtures::*, TestServer};
use reqwest::StatusCode;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connections"], 0);
}

// ============================================================================
// Chat Tests
// ============================================================================

#[tokio::test]
async fn test_open_chat_with_friend() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_as("/chats", ALICE, &OpenChatRequest::with(BOB))
        .await
        .unwrap();
    let chat: ChatResponse = assert_json(response, StatusCode::OK).await.unwrap();

    assert_eq!(chat.members.len(), 2);
    assert!(chat.members.iter().any(|m| m.id == ALICE));
    assert!(chat.members.iter().any(|m| m.id == BOB));
    assert!(chat.messages.is_empty());

    // Either side opening again lands on the same chat
    let response = server
        .post_as("/chats", BOB, &OpenChatRequest::with(ALICE))
        .await
        .unwrap();
    let again: ChatResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(again.id, chat.id);
}

#[tokio::test]
async fn test_open_chat_requires_friendship() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_as("/chats", CAROL, &OpenChatRequest::with(ALICE))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "AUTHORIZATION_ERROR");
}

#[tokio::test]
async fn test_open_chat_with_self_is_invalid() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_as("/chats", ALICE, &OpenChatRequest::with(ALICE))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_caller_is_unauthenticated() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post("/chats", &OpenChatRequest::with(BOB))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn test_list_chats() {
    let server = TestServer::start().await.unwrap();
    server
        .post_as("/chats", ALICE, &OpenChatRequest::with(BOB))
        .await
        .unwrap();

    let response = server.get_as("/chats", BOB).await.unwrap();
    let chats: Vec<ChatSummaryResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(chats.len(), 1);
    assert!(chats[0].last_message.is_none());

    let response = server.get_as("/chats", CAROL).await.unwrap();
    let chats: Vec<ChatSummaryResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(chats.is_empty());
}

// ============================================================================
// Message Tests
// ============================================================================

#[tokio::test]
async fn test_messages_are_members_only() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_as("/chats", ALICE, &OpenChatRequest::with(BOB))
        .await
        .unwrap();
    let chat: ChatResponse = assert_json(response, StatusCode::OK).await.unwrap();
    let path = format!("/chats/{}/messages", chat.id);

    let response = server.get_as(&path, BOB).await.unwrap();
    let page: MessagePage = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(page.messages.is_empty());
    assert!(page.next_cursor.is_none());

    let response = server.get_as(&path, CAROL).await.unwrap();
    let code = assert_error(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(code, "AUTHORIZATION_ERROR");
}

#[tokio::test]
async fn test_messages_limit_is_validated() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_as("/chats", ALICE, &OpenChatRequest::with(BOB))
        .await
        .unwrap();
    let chat: ChatResponse = assert_json(response, StatusCode::OK).await.unwrap();

    let response = server
        .get_as(&format!("/chats/{}/messages?limit=500", chat.id), ALICE)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "VALIDATION_ERROR");
}

// ============================================================================
// Presence Tests
// ============================================================================

#[tokio::test]
async fn test_presence_follows_connection() {
    let server = TestServer::start().await.unwrap();
    let path = format!("/users/{ALICE}/presence");

    let response = server.get(&path).await.unwrap();
    let status: PresenceStatus = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(!status.is_online);

    let mut client = server.connect().await.unwrap();
    client.go_online(ALICE, "alice").await.unwrap();

    let response = server.get(&path).await.unwrap();
    let status: PresenceStatus = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(status.user_id, ALICE);
    assert!(status.is_online);
}
