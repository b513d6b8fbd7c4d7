pub mod arguments;
pub mod auth;
pub mod conversations;
pub mod dto;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod users;

pub use middleware::require_auth;
pub use state::{AppState, CurrentUser};

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the whole HTTP application: public routes, bearer-protected routes,
/// CORS restricted to `allowed_origins`, and the Swagger UI.
pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(rest::root_handler))
        .route("/health", get(rest::health_handler))
        .route("/api/users/register", post(auth::register_handler))
        .route("/api/users/login", post(auth::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/users/logout", post(auth::logout_handler))
        .route(
            "/api/users/me",
            get(users::me_handler).put(users::update_me_handler),
        )
        .route(
            "/api/users/{id}",
            get(users::get_user_handler).delete(users::delete_user_handler),
        )
        .route(
            "/api/users/{id}/conversations",
            get(users::user_conversations_handler),
        )
        .route(
            "/api/conversations",
            get(conversations::list_conversations_handler)
                .post(conversations::create_conversation_handler),
        )
        .route(
            "/api/conversations/{id}",
            get(conversations::get_conversation_handler)
                .put(conversations::update_conversation_handler)
                .delete(conversations::delete_conversation_handler),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(conversations::list_messages_handler).post(conversations::create_message_handler),
        )
        .route(
            "/api/conversations/{id}/analyses",
            get(conversations::list_analyses_handler),
        )
        .route("/api/arguments/analyze", post(arguments::analyze_handler))
        .route(
            "/api/arguments/recommendations",
            post(arguments::recommendations_handler),
        )
        .route("/api/arguments/history", get(arguments::history_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}
