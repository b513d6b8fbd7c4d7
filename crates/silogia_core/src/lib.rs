pub mod analysis;
pub mod domain;
pub mod features;
pub mod memory;
pub mod paragraphs;
pub mod ports;
pub mod segmenter;
pub mod suggestions;
pub mod tagger;
pub mod tokenizer;

pub use analysis::{AnalysisError, AnalysisService, AnalysisTarget, DEFAULT_MAX_TEXT_CHARS};
pub use domain::{
    Analysis, ArgumentComponent, AuthSession, ComponentType, Conversation, Message, MessageRole,
    NewUser, Suggestion, SuggestionStatus, SuggestionType, User, UserCredentials, UserProfile,
    DEFAULT_CONVERSATION_TITLE,
};
pub use features::{FeatureExtractor, FeatureMap, FeatureValue};
pub use memory::InMemoryDatabase;
pub use ports::{
    CompletionService, DatabaseService, PortError, PortResult, SequenceTagger, TextAnnotator,
};
pub use suggestions::{RetryPolicy, SuggestionGenerator};
pub use tagger::{ArgumentExtractor, Label};
pub use tokenizer::{RuleAnnotator, Token};
