//! crates/silogia_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, the
//! pretrained tagging model, or the LLM API.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Analysis, AuthSession, Conversation, Message, MessageRole, NewUser, User, UserCredentials,
    UserProfile,
};
use crate::features::FeatureMap;
use crate::tagger::Label;
use crate::tokenizer::Token;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Fails with `Conflict` when the email or username is already registered.
    async fn create_user(&self, user: &NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    /// Looks a user up by username or email.
    async fn get_credentials(&self, login: &str) -> PortResult<UserCredentials>;

    async fn update_user_profile(&self, user_id: Uuid, profile: &UserProfile) -> PortResult<User>;

    /// Deletes the user and, by cascade, everything the user owns.
    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Auth Sessions ---
    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()>;

    /// Returns the owning user of a live (present and unexpired) session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Conversations ---
    async fn create_conversation(&self, user_id: Uuid, title: &str) -> PortResult<Conversation>;

    /// Fails with `NotFound` unless the conversation exists and belongs to `user_id`.
    async fn get_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> PortResult<Conversation>;

    /// Newest first.
    async fn list_conversations(&self, user_id: Uuid, skip: i64, limit: i64) -> PortResult<Vec<Conversation>>;

    async fn update_conversation_title(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: &str,
    ) -> PortResult<Conversation>;

    /// Deletes the conversation together with its messages and analyses.
    async fn delete_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> PortResult<()>;

    // --- Messages ---
    async fn create_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> PortResult<Message>;

    /// In insertion order.
    async fn list_messages(&self, conversation_id: Uuid) -> PortResult<Vec<Message>>;

    // --- Analyses ---
    /// Stores the message that carried the text, the analysis, its components and
    /// its suggestions in one transaction. `new_conversation`, when given, is
    /// inserted first in the same transaction.
    async fn save_analysis(
        &self,
        new_conversation: Option<&Conversation>,
        message: &Message,
        analysis: &Analysis,
    ) -> PortResult<()>;

    /// Newest first, each with its components and suggestions.
    async fn list_analyses(&self, conversation_id: Uuid) -> PortResult<Vec<Analysis>>;
}

/// Tokenizes a sentence and tags each token with its part of speech.
pub trait TextAnnotator: Send + Sync {
    fn annotate(&self, sentence: &str) -> Vec<Token>;
}

/// The pretrained sequence model: one label per feature map.
///
/// Implementations are shared read-only across concurrent requests.
pub trait SequenceTagger: Send + Sync {
    fn tag(&self, features: &[FeatureMap]) -> PortResult<Vec<Label>>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a single prompt to the language model and returns its text answer.
    async fn complete(&self, prompt: &str) -> PortResult<String>;
}
