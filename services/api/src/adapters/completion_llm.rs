//! services/api/src/adapters/completion_llm.rs
//!
//! This module contains the adapter for the suggestion LLM.
//! It implements the `CompletionService` port from the `core` crate. Timeouts
//! and the single retry live in the core's `SuggestionGenerator`.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use silogia_core::ports::{CompletionService, PortError, PortResult};
use tracing::debug;

const SYSTEM_PROMPT: &str = "Eres un experto en argumentación y lógica. Respondes siempre en español \
     y sigues exactamente el formato de salida que se te indica.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    async fn complete(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .temperature(0.3)
            .max_completion_tokens(800u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Transport and API failures are both worth one more try upstream.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unavailable("Suggestion LLM returned no text content.".to_string())
            })?;
        debug!(chars = content.len(), "Suggestion LLM answered");
        Ok(content)
    }
}
