//! REST handlers over the chat collaborator operations
//!
//! The caller is named by the `X-User-Id` header; there is no other
//! authentication on this surface.

use axum::{
    extract::{Path, State},
    Json,
};
use chat_core::protocol::{ChatResponse, ChatSummaryResponse, MessagePage, PresenceStatus};
use chat_service::dto::{CreateChatRequest, HealthResponse, MessagesQuery};
use chat_service::{ChatService, MessageService};

use super::error::ApiResult;
use super::extract::{parse_id, CallerId, ValidatedJson, ValidatedQuery};
use super::GatewayState;

/// POST /chats
pub async fn open_chat(
    State(state): State<GatewayState>,
    CallerId(user_id): CallerId,
    ValidatedJson(body): ValidatedJson<CreateChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let chat = ChatService::new(state.service_context())
        .get_or_create_chat(user_id, body.friend_id)
        .await?;
    Ok(Json(chat))
}

/// GET /chats
pub async fn list_chats(
    State(state): State<GatewayState>,
    CallerId(user_id): CallerId,
) -> ApiResult<Json<Vec<ChatSummaryResponse>>> {
    let chats = ChatService::new(state.service_context())
        .user_chats(user_id)
        .await?;
    Ok(Json(chats))
}

/// GET /chats/:chat_id/messages
pub async fn list_messages(
    State(state): State<GatewayState>,
    CallerId(user_id): CallerId,
    Path(chat_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<MessagesQuery>,
) -> ApiResult<Json<MessagePage>> {
    let chat_id = parse_id(&chat_id, "chat_id")?;
    let page = MessageService::new(state.service_context())
        .list_messages(chat_id, user_id, query.cursor, query.limit_or_default())
        .await?;
    Ok(Json(page))
}

/// GET /users/:user_id/presence
pub async fn user_presence(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<PresenceStatus>> {
    let user_id = parse_id(&user_id, "user_id")?;
    let is_online = state.presence().is_online(user_id).await;
    Ok(Json(PresenceStatus { user_id, is_online }))
}

/// GET /health
pub async fn health_check(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.connections().connection_count()))
}
