//! crates/silogia_core/src/analysis.rs
//!
//! The analysis orchestrator: validates the submitted text, extracts argument
//! components, optionally asks for suggestions, and stores everything as one
//! immutable `Analysis`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{
    Analysis, ArgumentComponent, Conversation, Message, MessageRole, Suggestion,
    SuggestionStatus,
};
use crate::ports::{DatabaseService, PortError};
use crate::suggestions::SuggestionGenerator;
use crate::tagger::ArgumentExtractor;

/// Default upper bound on submitted text, in characters.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("The text to analyze must not be empty")]
    EmptyText,
    #[error("The text has {length} characters; the maximum is {max}")]
    TextTooLong { length: usize, max: usize },
    #[error("Conversation {0} not found")]
    ConversationNotFound(Uuid),
    #[error("The argument tagging model is not available")]
    TaggerUnavailable,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// The conversation an analysis is stored in.
#[derive(Debug, Clone, Copy)]
pub enum AnalysisTarget<'a> {
    /// A conversation the caller already owns.
    Existing(Uuid),
    /// A conversation with this title, created in the same transaction as the analysis.
    New { title: &'a str },
}

/// Runs the whole pipeline for one request. Holds only shared, read-only parts.
#[derive(Clone)]
pub struct AnalysisService {
    db: Arc<dyn DatabaseService>,
    extractor: Option<ArgumentExtractor>,
    suggestions: SuggestionGenerator,
    max_text_chars: usize,
}

impl AnalysisService {
    /// `extractor` is `None` when the tagging model could not be loaded; every
    /// analysis then fails with `TaggerUnavailable`.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        extractor: Option<ArgumentExtractor>,
        suggestions: SuggestionGenerator,
        max_text_chars: usize,
    ) -> Self {
        Self {
            db,
            extractor,
            suggestions,
            max_text_chars,
        }
    }

    pub fn is_tagger_available(&self) -> bool {
        self.extractor.is_some()
    }

    /// Analyzes `text` for `user_id` and stores it in `target`.
    ///
    /// Nothing is written unless the whole analysis is stored, including a new
    /// conversation. Suggestion failures never fail the call; they surface
    /// through `Analysis::suggestion_status`.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn analyze(
        &self,
        user_id: Uuid,
        target: AnalysisTarget<'_>,
        text: &str,
        include_recommendations: bool,
    ) -> Result<Analysis, AnalysisError> {
        self.validate(text)?;

        let (conversation_id, new_conversation) = match target {
            AnalysisTarget::Existing(conversation_id) => {
                self.db
                    .get_conversation(user_id, conversation_id)
                    .await
                    .map_err(|e| match e {
                        PortError::NotFound(_) => AnalysisError::ConversationNotFound(conversation_id),
                        other => AnalysisError::Port(other),
                    })?;
                (conversation_id, None)
            }
            AnalysisTarget::New { title } => {
                let conversation = Conversation::new(user_id, title);
                (conversation.id, Some(conversation))
            }
        };

        let extractor = self.extractor.clone().ok_or(AnalysisError::TaggerUnavailable)?;
        let owned_text = text.to_string();
        // Tagging is CPU-bound; keep it off the async workers.
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&owned_text))
            .await
            .map_err(|e| PortError::Unexpected(format!("tagging task failed: {}", e)))?;

        let analysis_id = Uuid::new_v4();
        let components: Vec<ArgumentComponent> = extracted
            .iter()
            .enumerate()
            .map(|(i, c)| ArgumentComponent {
                id: Uuid::new_v4(),
                analysis_id,
                text: c.text.clone(),
                component_type: c.component_type,
                start_char: c.start_char,
                end_char: c.end_char,
                sequence_order: i,
            })
            .collect();

        let (suggestions, suggestion_status) = if include_recommendations {
            let outcome = self.suggestions.generate(text, &extracted).await;
            let suggestions = outcome
                .suggestions
                .into_iter()
                .map(|s| Suggestion {
                    id: Uuid::new_v4(),
                    analysis_id,
                    component_id: s.component_index.map(|i| components[i].id),
                    text: s.text,
                    suggestion_type: s.suggestion_type,
                })
                .collect();
            (suggestions, outcome.status)
        } else {
            (Vec::new(), SuggestionStatus::NotRequested)
        };

        let message = Message::new(conversation_id, MessageRole::User, text);
        let analysis = Analysis {
            id: analysis_id,
            conversation_id,
            message_id: message.id,
            source_text: text.to_string(),
            components,
            suggestions,
            suggestion_status,
            created_at: Utc::now(),
        };
        self.db
            .save_analysis(new_conversation.as_ref(), &message, &analysis)
            .await?;

        info!(
            analysis_id = %analysis.id,
            components = analysis.components.len(),
            suggestions = analysis.suggestions.len(),
            suggestion_status = analysis.suggestion_status.as_str(),
            "Analysis stored"
        );
        Ok(analysis)
    }

    /// Rejects empty and oversized text before any model is invoked.
    pub fn validate(&self, text: &str) -> Result<(), AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyText);
        }
        let length = text.chars().count();
        if length > self.max_text_chars {
            return Err(AnalysisError::TextTooLong {
                length,
                max: self.max_text_chars,
            });
        }
        Ok(())
    }
}
