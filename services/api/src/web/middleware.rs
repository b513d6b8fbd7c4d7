//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::state::{AppState, CurrentUser};

/// Middleware that validates the bearer token and its backing auth session.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// Malformed, expired, or revoked tokens get 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = state.jwt.verify(token).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| StatusCode::UNAUTHORIZED)?;
    let session_id = Uuid::parse_str(&claims.jti).map_err(|_| StatusCode::UNAUTHORIZED)?;

    // A signed token is only honoured while its session row exists.
    let owner = state
        .db
        .validate_auth_session(&claims.jti)
        .await
        .map_err(|e| {
            warn!(%user_id, "Auth session rejected: {}", e);
            StatusCode::UNAUTHORIZED
        })?;
    if owner != user_id {
        warn!(%user_id, "Token subject does not own its session");
        return Err(StatusCode::UNAUTHORIZED);
    }

    req.extensions_mut().insert(CurrentUser { user_id, session_id });
    Ok(next.run(req).await)
}
