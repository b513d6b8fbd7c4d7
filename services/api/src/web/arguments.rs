//! services/api/src/web/arguments.rs
//!
//! Argument analysis endpoints. When no conversation is named, one is created
//! together with the analysis and titled after the start of the submitted text.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use silogia_core::AnalysisTarget;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{analysis_error, port_error, HandlerError};
use crate::web::dto::{AnalysisResponse, ConversationResponse, Pagination};
use crate::web::state::{AppState, CurrentUser};

const HISTORY_LIMIT: i64 = 10;
const TITLE_PREVIEW_CHARS: usize = 30;

#[derive(Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub conversation_id: Option<Uuid>,
    pub text: String,
    /// Ask the language model for suggestions too. Defaults to `false`.
    #[serde(default)]
    pub include_recommendations: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct RecommendationRequest {
    pub conversation_id: Option<Uuid>,
    pub text: String,
}

fn auto_title(prefix: &str, text: &str) -> String {
    let preview: String = text.trim().chars().take(TITLE_PREVIEW_CHARS).collect();
    format!("{}: {}...", prefix, preview)
}

async fn run_analysis(
    state: &AppState,
    current: CurrentUser,
    conversation_id: Option<Uuid>,
    text: &str,
    include_recommendations: bool,
    title_prefix: &str,
) -> Result<AnalysisResponse, HandlerError> {
    let title = auto_title(title_prefix, text);
    let target = match conversation_id {
        Some(id) => AnalysisTarget::Existing(id),
        None => AnalysisTarget::New { title: &title },
    };

    let analysis = state
        .analysis
        .analyze(current.user_id, target, text, include_recommendations)
        .await
        .map_err(analysis_error)?;
    if conversation_id.is_none() {
        info!(conversation_id = %analysis.conversation_id, "Conversation created for analysis");
    }
    Ok(AnalysisResponse::from(analysis))
}

/// Extracts premises and conclusions, optionally with suggestions.
///
/// Suggestion failures still answer 200; see `suggestions_status`.
#[utoipa::path(
    post,
    path = "/api/arguments/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Stored analysis", body = AnalysisResponse),
        (status = 400, description = "Empty or oversized text"),
        (status = 404, description = "Unknown conversation"),
        (status = 503, description = "Tagging model not loaded")
    ),
    security(("bearer" = [])),
    tag = "arguments"
)]
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let response = run_analysis(
        &state,
        current,
        req.conversation_id,
        &req.text,
        req.include_recommendations,
        "Análisis",
    )
    .await?;
    Ok(Json(response))
}

/// Same as analyze with suggestions always requested.
#[utoipa::path(
    post,
    path = "/api/arguments/recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Stored analysis with suggestions", body = AnalysisResponse),
        (status = 400, description = "Empty or oversized text"),
        (status = 404, description = "Unknown conversation"),
        (status = 503, description = "Tagging model not loaded")
    ),
    security(("bearer" = [])),
    tag = "arguments"
)]
pub async fn recommendations_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RecommendationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let response = run_analysis(
        &state,
        current,
        req.conversation_id,
        &req.text,
        true,
        "Recomendaciones",
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/arguments/history",
    params(Pagination),
    responses((status = 200, description = "The caller's conversations, newest first", body = [ConversationResponse])),
    security(("bearer" = [])),
    tag = "arguments"
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, HandlerError> {
    let (skip, limit) = page.resolve(HISTORY_LIMIT);
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
