//! Ollama client implementation for local LLM inference

use async_trait::async_trait;
use civitas_core::error::Error;
use civitas_core::error::Result;
use governor::clock::DefaultClock;
use governor::state::InMemoryState;
use governor::state::NotKeyed;
use governor::Quota;
use governor::RateLimiter;
use moka::future::Cache;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing::instrument;

use crate::Completion;
use crate::CompletionParams;
use crate::LLMClient;
use crate::Message;
use crate::MessageRole;
use crate::TokenUsage;

/// Serde helpers for Duration
mod duration_serde {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serialize;
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Ollama API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL (defaults to http://localhost:11434)
    pub base_url: String,
    /// Model to use (e.g., "llama3.2:latest")
    pub model: String,
    /// Request timeout
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// Rate limit (requests per minute) - usually higher for local inference
    pub rate_limit: u32,
    /// Keep model loaded in memory
    #[serde(with = "duration_serde")]
    pub keep_alive: Duration,
    /// Additional model options
    pub options: OllamaOptions,
}

/// Ollama model options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaOptions {
    /// Top-k sampling
    pub top_k: Option<u32>,
    /// Context window size
    pub num_ctx: Option<u32>,
    /// Number of GPU layers to use
    pub num_gpu: Option<u32>,
}

impl Default for OllamaOptions {
    fn default() -> Self {
        Self {
            top_k: Some(40),
            num_ctx: Some(8192),
            num_gpu: None, // Auto-detect
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:latest".to_string(),
            timeout: Duration::from_secs(120), // Longer timeout for local inference
            rate_limit: 120,
            keep_alive: Duration::from_secs(600),
            options: OllamaOptions::default(),
        }
    }
}

/// Ollama API client
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    cache: Cache<String, String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {e}")))?;

        let rate_limit = NonZeroU32::new(config.rate_limit)
            .ok_or_else(|| Error::Configuration("Rate limit must be greater than 0".to_string()))?;
        let quota = Quota::per_minute(rate_limit);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        // Identical prompts within an hour reuse the cached response
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(1000)
            .build();

        Ok(Self {
            config,
            client,
            rate_limiter,
            cache,
        })
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
                json!({ "role": role, "content": msg.content })
            })
            .collect()
    }

    fn cache_key(&self, messages: &[Message], params: &CompletionParams) -> String {
        format!(
            "{}|{}|{}",
            self.config.model,
            params.temperature.unwrap_or_default(),
            serde_json::to_string(messages).unwrap_or_default()
        )
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    #[instrument(skip(self, messages, params))]
    async fn complete(&self, messages: &[Message], params: &CompletionParams) -> Result<Completion> {
        let key = self.cache_key(messages, params);
        if let Some(text) = self.cache.get(&key).await {
            debug!("Returning cached Ollama response");
            return Ok(Completion {
                text,
                usage: TokenUsage::default(),
                cost_usd: 0.0,
            });
        }

        self.rate_limiter.until_ready().await;

        let mut options = serde_json::Map::new();
        if let Some(top_k) = self.config.options.top_k {
            options.insert("top_k".to_string(), json!(top_k));
        }
        if let Some(num_ctx) = self.config.options.num_ctx {
            options.insert("num_ctx".to_string(), json!(num_ctx));
        }
        if let Some(num_gpu) = self.config.options.num_gpu {
            options.insert("num_gpu".to_string(), json!(num_gpu));
        }
        if let Some(temperature) = params.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(top_p) = params.top_p {
            options.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(max_tokens) = params.max_tokens {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }
        if let Some(stop) = &params.stop {
            options.insert("stop".to_string(), json!(stop));
        }

        let body = json!({
            "model": self.config.model,
            "messages": self.convert_messages(messages),
            "stream": false,
            "keep_alive": format!("{}s", self.config.keep_alive.as_secs()),
            "options": options,
        });

        let url = format!("{}/api/chat", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::LLMProvider(format!("Request failed: {e}")))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Error::RateLimit("ollama chat".to_string()))
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                return Err(Error::LLMProvider(format!(
                    "Ollama API error {status}: {error_text}"
                )));
            }
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMProvider(format!("Failed to parse response: {e}")))?;

        self.cache.insert(key, payload.message.content.clone()).await;

        Ok(Completion {
            text: payload.message.content,
            usage: TokenUsage {
                prompt_tokens: payload.prompt_eval_count,
                completion_tokens: payload.eval_count,
            },
            // Local inference is free
            cost_usd: 0.0,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(_) => Ok(false),
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
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.rate_limit, 120);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_config_duration_roundtrip() {
        let config = OllamaConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: OllamaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.timeout, config.timeout);
        assert_eq!(restored.keep_alive, config.keep_alive);
    }

    #[test]
    fn test_cache_key_varies_by_model_and_content() {
        let client = OllamaClient::new(OllamaConfig::default()).unwrap();
        let params = CompletionParams::default();
        let a = client.cache_key(&[Message::user("first")], &params);
        let b = client.cache_key(&[Message::user("second")], &params);
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = OllamaConfig {
            rate_limit: 0,
            ..Default::default()
        };
        assert!(OllamaClient::new(config).is_err());
    }
}
