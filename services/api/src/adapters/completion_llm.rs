//! services/api/src/adapters/completion_llm.rs
//!
//! This module contains the adapter for the completion provider.
//! It implements the `CompletionService` port from the `core` crate.

use std::time::Duration;

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

use support_chat_core::ports::{CompletionService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    /// Sends a single system + user exchange to the chat completions API.
    ///
    /// Sampling parameters are fixed: bounded output length, moderate
    /// randomness, no repetition penalties. Timeouts and API failures both
    /// surface as `PortError` so the chat service can degrade to its
    /// fallback reply.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(800u32)
            .temperature(0.7)
            .top_p(0.95)
            .frequency_penalty(0.0)
            .presence_penalty(0.0)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                PortError::Unexpected(format!(
                    "completion provider timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Unexpected(
                    "completion response contained no text content".to_string(),
                ))
            }
        } else {
            Err(PortError::Unexpected(
                "completion response contained no choices".to_string(),
            ))
        }
    }
}
