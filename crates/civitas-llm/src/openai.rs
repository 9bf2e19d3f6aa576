//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use civitas_core::error::Error;
use civitas_core::error::Result;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use tracing::instrument;

use crate::Completion;
use crate::CompletionParams;
use crate::LLMClient;
use crate::Message;
use crate::MessageRole;
use crate::TokenUsage;

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key
    pub api_key: String,
    /// Base URL (defaults to https://api.openai.com/v1)
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Price per 1K prompt tokens in USD
    pub prompt_cost_per_1k: f64,
    /// Price per 1K completion tokens in USD
    pub completion_cost_per_1k: f64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            // Do not read env in defaults to keep tests deterministic.
            // Callers should invoke LLMConfig::from_env() explicitly.
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: 60,
            prompt_cost_per_1k: 0.000_15,
            completion_cost_per_1k: 0.000_6,
        }
    }
}

impl OpenAIConfig {
    /// Cost of a call at this config's pricing
    pub fn cost_for(&self, usage: TokenUsage) -> f64 {
        usage.prompt_tokens as f64 / 1000.0 * self.prompt_cost_per_1k
            + usage.completion_tokens as f64 / 1000.0 * self.completion_cost_per_1k
    }
}

/// OpenAI-compatible API client
#[derive(Debug)]
pub struct OpenAIClient {
    client: Client,
    config: OpenAIConfig,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsagePayload>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct UsagePayload {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl OpenAIClient {
    /// Create a new client
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                };
                json!({
                    "role": role,
                    "content": msg.content
                })
            })
            .collect()
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    #[instrument(skip(self, messages, params))]
    async fn complete(&self, messages: &[Message], params: &CompletionParams) -> Result<Completion> {
        let mut request_body = json!({
            "model": self.config.model,
            "messages": self.convert_messages(messages),
        });
        if let Some(max_tokens) = params.max_tokens {
            request_body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = params.temperature {
            request_body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = params.top_p {
            request_body["top_p"] = json!(top_p);
        }
        if let Some(stop) = &params.stop {
            request_body["stop"] = json!(stop);
        }

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!("Making chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::LLMProvider(format!("Request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimit("chat completions".to_string()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LLMProvider(format!(
                "API error {status}: {error_text}"
            )));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMProvider(format!("Failed to parse response: {e}")))?;

        let text = payload
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| Error::LLMProvider("Response contained no message".to_string()))?;

        let usage = payload
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(Completion {
            text,
            cost_usd: self.config.cost_for(usage),
            usage,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url);
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OpenAIConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_cost_from_pricing_table() {
        let config = OpenAIConfig {
            prompt_cost_per_1k: 0.01,
            completion_cost_per_1k: 0.03,
            ..Default::default()
        };
        let usage = TokenUsage {
            prompt_tokens: 2000,
            completion_tokens: 1000,
        };
        assert!((config.cost_for(usage) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_message_conversion() {
        let client = OpenAIClient::new(OpenAIConfig::default()).unwrap();
        let messages = vec![
            Message::system("You annotate transcripts"),
            Message::user("Q: Hello?"),
        ];
        let converted = client.convert_messages(&messages);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0]["role"], "system");
        assert_eq!(converted[1]["role"], "user");
    }

    #[test]
    fn test_usage_payload_tolerates_missing_fields() {
        let payload: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "ok"}}]
        }))
        .unwrap();
        assert!(payload.usage.is_none());
    }
}
