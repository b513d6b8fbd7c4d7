//! services/api/src/web/dto.rs
//!
//! Request and response payloads shared by several route groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use silogia_core::domain::{
    Analysis, ArgumentComponent, Conversation, Message, Suggestion, User,
};
use silogia_core::paragraphs::{analyze_paragraphs, ParagraphAnalysis};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// `skip`/`limit` query parameters. Each route picks its own default limit.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        (self.skip.unwrap_or(0).max(0), self.limit.unwrap_or(default_limit).clamp(0, 100))
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponseGeneric {
    pub message: String,
}

impl MessageResponseGeneric {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub country: Option<String>,
    pub profession: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            full_name: user.profile.full_name,
            avatar_url: user.profile.avatar_url,
            bio: user.profile.bio,
            country: user.profile.country,
            profession: user.profile.profession,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            title: c.title,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            role: m.role.to_string(),
            content: m.content,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ComponentResponse {
    pub id: Uuid,
    pub text: String,
    pub component_type: String,
    pub start_char: usize,
    pub end_char: usize,
}

impl From<&ArgumentComponent> for ComponentResponse {
    fn from(c: &ArgumentComponent) -> Self {
        Self {
            id: c.id,
            text: c.text.clone(),
            component_type: c.component_type.to_string(),
            start_char: c.start_char,
            end_char: c.end_char,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SuggestionResponse {
    pub id: Uuid,
    /// `null` for suggestions about the text as a whole.
    pub component_id: Option<Uuid>,
    pub suggestion: String,
    pub suggestion_type: String,
}

impl From<&Suggestion> for SuggestionResponse {
    fn from(s: &Suggestion) -> Self {
        Self {
            id: s.id,
            component_id: s.component_id,
            suggestion: s.text.clone(),
            suggestion_type: s.suggestion_type.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ParagraphResponse {
    pub text: String,
    pub strength: String,
    pub strength_score: u32,
    pub premises_count: usize,
    pub conclusions_count: usize,
    pub word_count: usize,
    pub density: f64,
    pub recommendation: Option<String>,
}

impl From<ParagraphAnalysis> for ParagraphResponse {
    fn from(p: ParagraphAnalysis) -> Self {
        Self {
            text: p.text,
            strength: p.strength.to_string(),
            strength_score: p.strength_score,
            premises_count: p.premises_count,
            conclusions_count: p.conclusions_count,
            word_count: p.word_count,
            density: p.density,
            recommendation: p.recommendation.map(str::to_string),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AnalysisResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub components: Vec<ComponentResponse>,
    pub llm_suggestions: Vec<SuggestionResponse>,
    /// One of `not_requested`, `ok`, `unavailable`, `malformed`.
    pub suggestions_status: String,
    pub paragraphs: Vec<ParagraphResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<Analysis> for AnalysisResponse {
    fn from(a: Analysis) -> Self {
        let paragraphs = analyze_paragraphs(&a.source_text, &a.components)
            .into_iter()
            .map(ParagraphResponse::from)
            .collect();
        Self {
            id: a.id,
            conversation_id: a.conversation_id,
            message_id: a.message_id,
            components: a.components.iter().map(ComponentResponse::from).collect(),
            llm_suggestions: a.suggestions.iter().map(SuggestionResponse::from).collect(),
            suggestions_status: a.suggestion_status.to_string(),
            paragraphs,
            created_at: a.created_at,
        }
    }
}
