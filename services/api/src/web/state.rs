//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the authenticated caller.

use silogia_core::analysis::AnalysisService;
use silogia_core::ports::DatabaseService;
use std::sync::Arc;
use uuid::Uuid;

use crate::web::auth::JwtKeys;

/// The shared application state, created once at startup and passed to all handlers.
/// Everything in it is read-only after construction.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub analysis: AnalysisService,
    pub jwt: JwtKeys,
}

/// Inserted into request extensions by `require_auth`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
    /// The token's `jti`, i.e. the auth session row backing it.
    pub session_id: Uuid,
}
