//! services/api/src/web/conversations.rs
//!
//! Conversation CRUD plus the messages and analyses stored inside a conversation.
//! Every route is scoped to the caller; other users' conversations read as 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use silogia_core::domain::{MessageRole, DEFAULT_CONVERSATION_TITLE};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_error, HandlerError};
use crate::web::dto::{AnalysisResponse, ConversationResponse, MessageResponse, Pagination};
use crate::web::state::{AppState, CurrentUser};

const CONVERSATIONS_LIMIT: i64 = 50;

#[derive(Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateConversationRequest {
    pub title: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    /// `user` (default), `assistant` or `system`.
    pub role: Option<String>,
    pub content: String,
}

#[derive(Serialize, ToSchema)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: ConversationResponse,
    pub messages: Vec<MessageResponse>,
}

#[utoipa::path(
    post,
    path = "/api/conversations",
    request_body = CreateConversationRequest,
    responses((status = 201, description = "Conversation created", body = ConversationResponse)),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn create_conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CONVERSATION_TITLE);
    let conversation = state
        .db
        .create_conversation(current.user_id, title)
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(ConversationResponse::from(conversation))))
}

#[utoipa::path(
    get,
    path = "/api/conversations",
    params(Pagination),
    responses((status = 200, description = "Newest conversations first", body = [ConversationResponse])),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn list_conversations_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, HandlerError> {
    let (skip, limit) = page.resolve(CONVERSATIONS_LIMIT);
    let conversations = state
        .db
        .list_conversations(current.user_id, skip, limit)
        .await
        .map_err(port_error)?;
    Ok(Json(
        conversations
            .into_iter()
            .map(ConversationResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation with its messages", body = ConversationWithMessages),
        (status = 404, description = "No such conversation")
    ),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn get_conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let conversation = state
        .db
        .get_conversation(current.user_id, conversation_id)
        .await
        .map_err(port_error)?;
    let messages = state
        .db
        .list_messages(conversation_id)
        .await
        .map_err(port_error)?;
    Ok(Json(ConversationWithMessages {
        conversation: conversation.into(),
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/conversations/{id}",
    params(("id" = Uuid, Path, description = "Conversation id")),
    request_body = UpdateConversationRequest,
    responses(
        (status = 200, description = "Renamed conversation", body = ConversationResponse),
        (status = 400, description = "Empty title"),
        (status = 404, description = "No such conversation")
    ),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn update_conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<UpdateConversationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title must not be empty".to_string()));
    }
    let conversation = state
        .db
        .update_conversation_title(current.user_id, conversation_id, title)
        .await
        .map_err(port_error)?;
    Ok(Json(ConversationResponse::from(conversation)))
}

#[utoipa::path(
    delete,
    path = "/api/conversations/{id}",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 204, description = "Conversation, messages and analyses deleted"),
        (status = 404, description = "No such conversation")
    ),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn delete_conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .db
        .delete_conversation(current.user_id, conversation_id)
        .await
        .map_err(port_error)?;
    info!(%conversation_id, "Conversation deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}/messages",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages in insertion order", body = [MessageResponse]),
        (status = 404, description = "No such conversation")
    ),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .db
        .get_conversation(current.user_id, conversation_id)
        .await
        .map_err(port_error)?;
    let messages = state
        .db
        .list_messages(conversation_id)
        .await
        .map_err(port_error)?;
    Ok(Json(
        messages
            .into_iter()
            .map(MessageResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/messages",
    params(("id" = Uuid, Path, description = "Conversation id")),
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Empty content or unknown role"),
        (status = 404, description = "No such conversation")
    ),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn create_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if req.content.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message content must not be empty".to_string()));
    }
    let role = match req.role.as_deref() {
        None => MessageRole::User,
        Some(raw) => raw
            .parse::<MessageRole>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
    };
    state
        .db
        .get_conversation(current.user_id, conversation_id)
        .await
        .map_err(port_error)?;
    let message = state
        .db
        .create_message(conversation_id, role, &req.content)
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}/analyses",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Analyses, newest first", body = [AnalysisResponse]),
        (status = 404, description = "No such conversation")
    ),
    security(("bearer" = [])),
    tag = "conversations"
)]
pub async fn list_analyses_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .db
        .get_conversation(current.user_id, conversation_id)
        .await
        .map_err(port_error)?;
    let analyses = state
        .db
        .list_analyses(conversation_id)
        .await
        .map_err(port_error)?;
    Ok(Json(
        analyses
            .into_iter()
            .map(AnalysisResponse::from)
            .collect::<Vec<_>>(),
    ))
}
