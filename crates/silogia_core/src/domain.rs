//! crates/silogia_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Title given to conversations created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "Nueva Conversación";

//=========================================================================================
// Users and Authentication
//=========================================================================================

/// Represents a registered user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The owner-editable part of a user record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub country: Option<String>,
    pub profession: Option<String>,
}

impl UserProfile {
    /// Overlays every field that is set in `update` onto `self`.
    pub fn merge(&mut self, update: UserProfile) {
        if update.full_name.is_some() {
            self.full_name = update.full_name;
        }
        if update.avatar_url.is_some() {
            self.avatar_url = update.avatar_url;
        }
        if update.bio.is_some() {
            self.bio = update.bio;
        }
        if update.country.is_some() {
            self.country = update.country;
        }
        if update.profession.is_some() {
            self.profession = update.profession;
        }
    }
}

/// Data needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub profile: UserProfile,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub hashed_password: String,
}

/// A server-side record of an issued token, keyed by the token's `jti` claim.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Conversations and Messages
//=========================================================================================

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// A single entry in a conversation. Immutable once stored.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

//=========================================================================================
// Analyses
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Premise,
    Conclusion,
    None,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Premise => "premise",
            ComponentType::Conclusion => "conclusion",
            ComponentType::None => "none",
        }
    }
}

/// A premise or conclusion located in an analysed text.
///
/// `start_char` and `end_char` are character (not byte) offsets into the
/// analysis' source text, with `start_char < end_char`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentComponent {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub text: String,
    pub component_type: ComponentType,
    pub start_char: usize,
    pub end_char: usize,
    pub sequence_order: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionType {
    Improvement,
    Warning,
    Praise,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Improvement => "improvement",
            SuggestionType::Warning => "warning",
            SuggestionType::Praise => "praise",
        }
    }
}

/// An LLM-produced remark. `component_id` is `None` for remarks on the whole text.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub component_id: Option<Uuid>,
    pub text: String,
    pub suggestion_type: SuggestionType,
}

/// How the suggestion step of an analysis ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionStatus {
    NotRequested,
    Ok,
    Unavailable,
    Malformed,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::NotRequested => "not_requested",
            SuggestionStatus::Ok => "ok",
            SuggestionStatus::Unavailable => "unavailable",
            SuggestionStatus::Malformed => "malformed",
        }
    }
}

/// One complete run of the pipeline over a submitted text. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub source_text: String,
    pub components: Vec<ArgumentComponent>,
    pub suggestions: Vec<Suggestion>,
    pub suggestion_status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// String Conversions
//=========================================================================================

/// Error returned when a stored enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! str_enum {
    ($ty:ident, $kind:literal, { $($text:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(MessageRole, "message role", {
    "user" => MessageRole::User,
    "assistant" => MessageRole::Assistant,
    "system" => MessageRole::System,
});

str_enum!(ComponentType, "component type", {
    "premise" => ComponentType::Premise,
    "conclusion" => ComponentType::Conclusion,
    "none" => ComponentType::None,
});

str_enum!(SuggestionType, "suggestion type", {
    "improvement" => SuggestionType::Improvement,
    "warning" => SuggestionType::Warning,
    "praise" => SuggestionType::Praise,
});

str_enum!(SuggestionStatus, "suggestion status", {
    "not_requested" => SuggestionStatus::NotRequested,
    "ok" => SuggestionStatus::Ok,
    "unavailable" => SuggestionStatus::Unavailable,
    "malformed" => SuggestionStatus::Malformed,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_strings() {
        assert_eq!("premise".parse::<ComponentType>(), Ok(ComponentType::Premise));
        assert_eq!(" Warning ".parse::<SuggestionType>(), Ok(SuggestionType::Warning));
        assert_eq!(MessageRole::System.to_string(), "system");
        assert!("claim".parse::<ComponentType>().is_err());
    }

    #[test]
    fn profile_merge_only_overwrites_provided_fields() {
        let mut profile = UserProfile {
            full_name: Some("Ana".into()),
            country: Some("Chile".into()),
            ..Default::default()
        };
        profile.merge(UserProfile {
            country: Some("Perú".into()),
            bio: Some("Docente".into()),
            ..Default::default()
        });
        assert_eq!(profile.full_name.as_deref(), Some("Ana"));
        assert_eq!(profile.country.as_deref(), Some("Perú"));
        assert_eq!(profile.bio.as_deref(), Some("Docente"));
    }
}
