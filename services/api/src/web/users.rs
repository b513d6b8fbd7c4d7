//! services/api/src/web/users.rs
//!
//! Profile endpoints. A user may only read or delete their own account.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use silogia_core::domain::UserProfile;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_error, HandlerError};
use crate::web::dto::{ConversationResponse, MessageResponseGeneric, Pagination, UserResponse};
use crate::web::state::{AppState, CurrentUser};

const USER_CONVERSATIONS_LIMIT: i64 = 20;

/// Only the fields present are changed.
#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub country: Option<String>,
    pub profession: Option<String>,
}

fn ensure_self(current: &CurrentUser, user_id: Uuid) -> Result<(), HandlerError> {
    if current.user_id == user_id {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            "Not allowed to access another user's account".to_string(),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .db
        .get_user_by_id(current.user_id)
        .await
        .map_err(port_error)?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let update = UserProfile {
        full_name: req.full_name,
        avatar_url: req.avatar_url,
        bio: req.bio,
        country: req.country,
        profession: req.profession,
    };
    let user = state
        .db
        .update_user_profile(current.user_id, &update)
        .await
        .map_err(port_error)?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 403, description = "Another user's account"),
        (status = 404, description = "No such user")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    ensure_self(&current, user_id)?;
    let user = state.db.get_user_by_id(user_id).await.map_err(port_error)?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/conversations",
    params(("id" = Uuid, Path, description = "User id"), Pagination),
    responses(
        (status = 200, description = "Newest conversations first", body = [ConversationResponse]),
        (status = 403, description = "Another user's account")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn user_conversations_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, HandlerError> {
    ensure_self(&current, user_id)?;
    let (skip, limit) = page.resolve(USER_CONVERSATIONS_LIMIT);
    let conversations = state
        .db
        .list_conversations(user_id, skip, limit)
        .await
        .map_err(port_error)?;
    Ok(Json(
        conversations
            .into_iter()
            .map(ConversationResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Deletes the account together with its sessions, conversations, messages and analyses.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponseGeneric),
        (status = 403, description = "Another user's account")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    ensure_self(&current, user_id)?;
    state.db.delete_user(user_id).await.map_err(port_error)?;
    info!(%user_id, "User deleted");
    Ok(Json(MessageResponseGeneric::new("User deleted successfully")))
}
