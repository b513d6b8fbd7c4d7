//! crates/silogia_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. It keeps the same
//! ownership, uniqueness and cascade rules as the relational schema and backs the
//! test suites as well as local runs without a database server.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Analysis, AuthSession, Conversation, Message, MessageRole, NewUser, User, UserCredentials,
    UserProfile,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    sessions: Vec<AuthSession>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    analyses: Vec<Analysis>,
}

impl Tables {
    fn cascade_conversation(&mut self, conversation_id: Uuid) {
        self.messages.retain(|m| m.conversation_id != conversation_id);
        self.analyses.retain(|a| a.conversation_id != conversation_id);
    }
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store poisoned".to_string()))
    }

    /// Total number of messages and analyses still stored for a conversation id.
    pub fn rows_for_conversation(&self, conversation_id: Uuid) -> usize {
        self.lock()
            .map(|t| {
                t.messages.iter().filter(|m| m.conversation_id == conversation_id).count()
                    + t.analyses.iter().filter(|a| a.conversation_id == conversation_id).count()
            })
            .unwrap_or(0)
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(&self, user: &NewUser) -> PortResult<User> {
        let mut tables = self.lock()?;
        let email = user.email.to_lowercase();
        if tables.users.iter().any(|(u, _)| u.email.to_lowercase() == email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        if tables.users.iter().any(|(u, _)| u.username == user.username) {
            return Err(PortError::Conflict("Username already taken".to_string()));
        }
        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            username: user.username.clone(),
            profile: user.profile.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push((record.clone(), user.hashed_password.clone()));
        Ok(record)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.lock()?
            .users
            .iter()
            .find(|(u, _)| u.id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn get_credentials(&self, login: &str) -> PortResult<UserCredentials> {
        let tables = self.lock()?;
        let email = login.to_lowercase();
        // An exact username match wins over an email match.
        tables
            .users
            .iter()
            .find(|(u, _)| u.username == login)
            .or_else(|| tables.users.iter().find(|(u, _)| u.email.to_lowercase() == email))
            .map(|(u, hash)| UserCredentials {
                user_id: u.id,
                email: u.email.clone(),
                username: u.username.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| not_found("User", login))
    }

    async fn update_user_profile(&self, user_id: Uuid, profile: &UserProfile) -> PortResult<User> {
        let mut tables = self.lock()?;
        let (user, _) = tables
            .users
            .iter_mut()
            .find(|(u, _)| u.id == user_id)
            .ok_or_else(|| not_found("User", user_id))?;
        user.profile.merge(profile.clone());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.lock()?;
        let before = tables.users.len();
        tables.users.retain(|(u, _)| u.id != user_id);
        if tables.users.len() == before {
            return Err(not_found("User", user_id));
        }
        tables.sessions.retain(|s| s.user_id != user_id);
        let owned: Vec<Uuid> = tables
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect();
        tables.conversations.retain(|c| c.user_id != user_id);
        for id in owned {
            tables.cascade_conversation(id);
        }
        Ok(())
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        self.lock()?.sessions.push(session.clone());
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.lock()?
            .sessions
            .iter()
            .find(|s| s.id == session_id && s.expires_at > Utc::now())
            .map(|s| s.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.lock()?.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn create_conversation(&self, user_id: Uuid, title: &str) -> PortResult<Conversation> {
        let mut tables = self.lock()?;
        if !tables.users.iter().any(|(u, _)| u.id == user_id) {
            return Err(not_found("User", user_id));
        }
        let conversation = Conversation::new(user_id, title);
        tables.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> PortResult<Conversation> {
        self.lock()?
            .conversations
            .iter()
            .find(|c| c.id == conversation_id && c.user_id == user_id)
            .cloned()
            .ok_or_else(|| not_found("Conversation", conversation_id))
    }

    async fn list_conversations(&self, user_id: Uuid, skip: i64, limit: i64) -> PortResult<Vec<Conversation>> {
        let tables = self.lock()?;
        let mut owned: Vec<Conversation> = tables
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        // Insertion order breaks ties between equal timestamps.
        owned.reverse();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update_conversation_title(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: &str,
    ) -> PortResult<Conversation> {
        let mut tables = self.lock()?;
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id && c.user_id == user_id)
            .ok_or_else(|| not_found("Conversation", conversation_id))?;
        conversation.title = title.to_string();
        conversation.updated_at = Utc::now();
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, user_id: Uuid, conversation_id: Uuid) -> PortResult<()> {
        let mut tables = self.lock()?;
        let before = tables.conversations.len();
        tables
            .conversations
            .retain(|c| !(c.id == conversation_id && c.user_id == user_id));
        if tables.conversations.len() == before {
            return Err(not_found("Conversation", conversation_id));
        }
        tables.cascade_conversation(conversation_id);
        Ok(())
    }

    async fn create_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> PortResult<Message> {
        let mut tables = self.lock()?;
        if !tables.conversations.iter().any(|c| c.id == conversation_id) {
            return Err(not_found("Conversation", conversation_id));
        }
        let message = Message::new(conversation_id, role, content);
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> PortResult<Vec<Message>> {
        Ok(self
            .lock()?
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn save_analysis(
        &self,
        new_conversation: Option<&Conversation>,
        message: &Message,
        analysis: &Analysis,
    ) -> PortResult<()> {
        let mut tables = self.lock()?;
        if let Some(conversation) = new_conversation {
            if !tables.users.iter().any(|(u, _)| u.id == conversation.user_id) {
                return Err(not_found("User", conversation.user_id));
            }
        } else if !tables.conversations.iter().any(|c| c.id == analysis.conversation_id) {
            return Err(not_found("Conversation", analysis.conversation_id));
        }
        if let Some(conversation) = new_conversation {
            tables.conversations.push(conversation.clone());
        }
        tables.messages.push(message.clone());
        tables.analyses.push(analysis.clone());
        Ok(())
    }

    async fn list_analyses(&self, conversation_id: Uuid) -> PortResult<Vec<Analysis>> {
        Ok(self
            .lock()?
            .analyses
            .iter()
            .rev()
            .filter(|a| a.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}
