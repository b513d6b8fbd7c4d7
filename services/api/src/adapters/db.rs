//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use silogia_core::domain::{
    Analysis, ArgumentComponent, AuthSession, Conversation, Message, MessageRole, NewUser,
    Suggestion, User, UserCredentials, UserProfile,
};
use silogia_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::error;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn components_for(&self, ids: &[Uuid]) -> PortResult<HashMap<Uuid, Vec<ArgumentComponent>>> {
        let records = sqlx::query_as::<_, ComponentRecord>(
            "SELECT id, analysis_id, text, component_type, start_char, end_char, sequence_order
             FROM argument_components WHERE analysis_id = ANY($1)
             ORDER BY sequence_order",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut grouped: HashMap<Uuid, Vec<ArgumentComponent>> = HashMap::new();
        for record in records {
            let component = record.to_domain()?;
            grouped.entry(component.analysis_id).or_default().push(component);
        }
        Ok(grouped)
    }

    async fn suggestions_for(&self, ids: &[Uuid]) -> PortResult<HashMap<Uuid, Vec<Suggestion>>> {
        let records = sqlx::query_as::<_, SuggestionRecord>(
            "SELECT id, analysis_id, component_id, suggestion, suggestion_type
             FROM suggestions WHERE analysis_id = ANY($1)
             ORDER BY sequence_order",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut grouped: HashMap<Uuid, Vec<Suggestion>> = HashMap::new();
        for record in records {
            let suggestion = record.to_domain()?;
            grouped.entry(suggestion.analysis_id).or_default().push(suggestion);
        }
        Ok(grouped)
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    error!("Database error: {:?}", e);
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: &str, id: impl std::fmt::Display) -> impl FnOnce(sqlx::Error) -> PortError {
    let message = format!("{} {} not found", what, id);
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(message),
        other => unexpected(other),
    }
}

/// Parses a stored enum column; a bad value means the row was written by
/// something other than this adapter.
fn column<T: FromStr>(value: &str) -> PortResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| PortError::Unexpected(format!("corrupt row: {}", e)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    username: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    country: Option<String>,
    profession: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            username: self.username,
            profile: UserProfile {
                full_name: self.full_name,
                avatar_url: self.avatar_url,
                bio: self.bio,
                country: self.country,
                profession: self.profession,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, full_name, avatar_url, bio, country, profession, created_at, updated_at";

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    username: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct ConversationRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ConversationRecord {
    fn to_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    conversation_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        Ok(Message {
            id: self.id,
            conversation_id: self.conversation_id,
            role: column(&self.role)?,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct AnalysisRecord {
    id: Uuid,
    conversation_id: Uuid,
    message_id: Uuid,
    source_text: String,
    suggestion_status: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ComponentRecord {
    id: Uuid,
    analysis_id: Uuid,
    text: String,
    component_type: String,
    start_char: i32,
    end_char: i32,
    sequence_order: i32,
}
impl ComponentRecord {
    fn to_domain(self) -> PortResult<ArgumentComponent> {
        Ok(ArgumentComponent {
            id: self.id,
            analysis_id: self.analysis_id,
            text: self.text,
            component_type: column(&self.component_type)?,
            start_char: self.start_char as usize,
            end_char: self.end_char as usize,
            sequence_order: self.sequence_order as usize,
        })
    }
}

#[derive(FromRow)]
struct SuggestionRecord {
    id: Uuid,
    analysis_id: Uuid,
    component_id: Option<Uuid>,
    suggestion: String,
    suggestion_type: String,
}
impl SuggestionRecord {
    fn to_domain(self) -> PortResult<Suggestion> {
        Ok(Suggestion {
            id: self.id,
            analysis_id: self.analysis_id,
            component_id: self.component_id,
            text: self.suggestion,
            suggestion_type: column(&self.suggestion_type)?,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: &NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, username, hashed_password, full_name, avatar_url, bio, country, profession)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.hashed_password)
            .bind(&user.profile.full_name)
            .bind(&user.profile.avatar_url)
            .bind(&user.profile.bio)
            .bind(&user.profile.country)
            .bind(&user.profile.profession)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    if db.constraint() == Some("users_username_key") {
                        PortError::Conflict("Username already taken".to_string())
                    } else {
                        PortError::Conflict("Email already registered".to_string())
                    }
                }
                other => unexpected(other),
            })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("User", user_id))?;
        Ok(record.to_domain())
    }

    async fn get_credentials(&self, login: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, username, hashed_password FROM users
             WHERE username = $1 OR LOWER(email) = LOWER($1)
             ORDER BY (username = $1) DESC
             LIMIT 1",
        )
        .bind(login)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("User", login))?;

        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            username: record.username,
            hashed_password: record.hashed_password,
        })
    }

    async fn update_user_profile(&self, user_id: Uuid, profile: &UserProfile) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET
                full_name = COALESCE($2, full_name),
                avatar_url = COALESCE($3, avatar_url),
                bio = COALESCE($4, bio),
                country = COALESCE($5, country),
                profession = COALESCE($6, profession),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(&profile.full_name)
            .bind(&profile.avatar_url)
            .bind(&profile.bio)
            .bind(&profile.country)
            .bind(&profile.profession)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("User", user_id))?;
        Ok(record.to_domain())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_conversation(&self, user_id: Uuid, title: &str) -> PortResult<Conversation> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            "INSERT INTO conversations (id, user_id, title) VALUES ($1, $2, $3)
             RETURNING id, user_id, title, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("User {} not found", user_id))
            }
            other => unexpected(other),
        })?;
        Ok(record.to_domain())
    }

    async fn get_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> PortResult<Conversation> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            "SELECT id, user_id, title, created_at, updated_at FROM conversations
             WHERE id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Conversation", conversation_id))?;
        Ok(record.to_domain())
    }

    async fn list_conversations(&self, user_id: Uuid, skip: i64, limit: i64) -> PortResult<Vec<Conversation>> {
        let records = sqlx::query_as::<_, ConversationRecord>(
            "SELECT id, user_id, title, created_at, updated_at FROM conversations
             WHERE user_id = $1
             ORDER BY created_at DESC
             OFFSET $2 LIMIT $3",
        )
        .bind(user_id)
        .bind(skip.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_conversation_title(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: &str,
    ) -> PortResult<Conversation> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            "UPDATE conversations SET title = $3, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, title, created_at, updated_at",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Conversation", conversation_id))?;
        Ok(record.to_domain())
    }

    async fn delete_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Conversation {} not found",
                conversation_id
            )));
        }
        Ok(())
    }

    async fn create_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> PortResult<Message> {
        let message = Message::new(conversation_id, role, content);
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Conversation {} not found", conversation_id))
            }
            other => unexpected(other),
        })?;
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, conversation_id, role, content, created_at FROM messages
             WHERE conversation_id = $1 ORDER BY seq",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn save_analysis(
        &self,
        new_conversation: Option<&Conversation>,
        message: &Message,
        analysis: &Analysis,
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        if let Some(conversation) = new_conversation {
            sqlx::query(
                "INSERT INTO conversations (id, user_id, title, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(conversation.id)
            .bind(conversation.user_id)
            .bind(&conversation.title)
            .bind(conversation.created_at)
            .bind(conversation.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    PortError::NotFound(format!("User {} not found", conversation.user_id))
                }
                other => unexpected(other),
            })?;
        }

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => PortError::NotFound(
                format!("Conversation {} not found", message.conversation_id),
            ),
            other => unexpected(other),
        })?;

        sqlx::query(
            "INSERT INTO analyses (id, conversation_id, message_id, source_text, suggestion_status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(analysis.id)
        .bind(analysis.conversation_id)
        .bind(analysis.message_id)
        .bind(&analysis.source_text)
        .bind(analysis.suggestion_status.as_str())
        .bind(analysis.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        for component in &analysis.components {
            sqlx::query(
                "INSERT INTO argument_components
                    (id, analysis_id, text, component_type, start_char, end_char, sequence_order)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(component.id)
            .bind(component.analysis_id)
            .bind(&component.text)
            .bind(component.component_type.as_str())
            .bind(component.start_char as i32)
            .bind(component.end_char as i32)
            .bind(component.sequence_order as i32)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        for (order, suggestion) in analysis.suggestions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO suggestions
                    (id, analysis_id, component_id, suggestion, suggestion_type, sequence_order)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(suggestion.id)
            .bind(suggestion.analysis_id)
            .bind(suggestion.component_id)
            .bind(&suggestion.text)
            .bind(suggestion.suggestion_type.as_str())
            .bind(order as i32)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        // Dropping `tx` on any early return rolls everything back.
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn list_analyses(&self, conversation_id: Uuid) -> PortResult<Vec<Analysis>> {
        let records = sqlx::query_as::<_, AnalysisRecord>(
            "SELECT id, conversation_id, message_id, source_text, suggestion_status, created_at
             FROM analyses WHERE conversation_id = $1
             ORDER BY created_at DESC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut components = self.components_for(&ids).await?;
        let mut suggestions = self.suggestions_for(&ids).await?;

        records
            .into_iter()
            .map(|r| {
                Ok(Analysis {
                    id: r.id,
                    conversation_id: r.conversation_id,
                    message_id: r.message_id,
                    source_text: r.source_text,
                    components: components.remove(&r.id).unwrap_or_default(),
                    suggestions: suggestions.remove(&r.id).unwrap_or_default(),
                    suggestion_status: column(&r.suggestion_status)?,
                    created_at: r.created_at,
                })
            })
            .collect()
    }
}
