//! LLM client implementations for Civitas
//!
//! The annotation pipeline treats the LLM provider as an opaque
//! text-completion service. This crate provides the provider clients
//! (an OpenAI-compatible remote API and local Ollama), the shared message
//! and usage types, and a factory keyed by configuration.

#![warn(missing_docs)]

use async_trait::async_trait;
use civitas_core::error::Result;
use serde::Deserialize;
use serde::Serialize;

mod openai;
pub use openai::OpenAIClient;
pub use openai::OpenAIConfig;

mod ollama;
pub use ollama::OllamaClient;
pub use ollama::OllamaConfig;
pub use ollama::OllamaOptions;

mod config;
pub use config::LLMConfig;
pub use config::LLMProvider;

mod factory;
pub use factory::create_llm_client;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage reported by the provider for one call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u64,
    /// Tokens in the completion
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Total tokens for the call
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A completed LLM call: the response text plus its cost
#[derive(Debug, Clone)]
pub struct Completion {
    /// Response text
    pub text: String,
    /// Token usage reported by the provider
    pub usage: TokenUsage,
    /// Cost of the call in USD (0.0 for local inference)
    pub cost_usd: f64,
}

/// LLM completion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Top-p sampling
    pub top_p: Option<f32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: Some(2000),
            temperature: Some(0.2),
            top_p: Some(1.0),
            stop: None,
        }
    }
}

/// Trait for LLM clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Complete a conversation
    async fn complete(&self, messages: &[Message], params: &CompletionParams) -> Result<Completion>;

    /// Check that the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// The model this client is configured for
    fn model_name(&self) -> &str;
}
