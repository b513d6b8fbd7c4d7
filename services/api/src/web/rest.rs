//! services/api/src/web/rest.rs
//!
//! Contains the service-level handlers (root and health) and the master
//! definition for the OpenAPI specification.

use axum::response::{IntoResponse, Json};
use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::web::{arguments, auth, conversations, dto, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        users::me_handler,
        users::update_me_handler,
        users::get_user_handler,
        users::user_conversations_handler,
        users::delete_user_handler,
        conversations::create_conversation_handler,
        conversations::list_conversations_handler,
        conversations::get_conversation_handler,
        conversations::update_conversation_handler,
        conversations::delete_conversation_handler,
        conversations::list_messages_handler,
        conversations::create_message_handler,
        conversations::list_analyses_handler,
        arguments::analyze_handler,
        arguments::recommendations_handler,
        arguments::history_handler,
    ),
    components(
        schemas(
            RootResponse,
            HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::TokenResponse,
            users::UpdateProfileRequest,
            conversations::CreateConversationRequest,
            conversations::UpdateConversationRequest,
            conversations::CreateMessageRequest,
            conversations::ConversationWithMessages,
            arguments::AnalyzeRequest,
            arguments::RecommendationRequest,
            dto::UserResponse,
            dto::ConversationResponse,
            dto::MessageResponse,
            dto::MessageResponseGeneric,
            dto::ComponentResponse,
            dto::SuggestionResponse,
            dto::ParagraphResponse,
            dto::AnalysisResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Silogia API", description = "Argument analysis for Spanish text: premises, conclusions and suggestions."),
        (name = "users", description = "Accounts and sessions"),
        (name = "conversations", description = "Conversations, messages and stored analyses"),
        (name = "arguments", description = "Argument analysis")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Service Handlers
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct RootResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = RootResponse))
)]
pub async fn root_handler() -> impl IntoResponse {
    Json(RootResponse {
        status: "ok".to_string(),
        message: "Silogia API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Liveness probe", body = HealthResponse))
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
