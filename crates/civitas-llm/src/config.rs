//! LLM configuration for multiple providers

use crate::OllamaConfig;
use crate::OpenAIConfig;
use serde::Deserialize;
use serde::Serialize;

/// LLM provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Primary LLM provider to use
    pub provider: LLMProvider,
    /// OpenAI-compatible API configuration
    pub openai: OpenAIConfig,
    /// Ollama configuration
    pub ollama: OllamaConfig,
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    /// OpenAI-compatible remote API
    OpenAI,
    /// Local Ollama models
    Ollama,
}

impl Default for LLMProvider {
    fn default() -> Self {
        Self::Ollama // Default to free local option
    }
}

impl LLMConfig {
    /// Get the active provider's name as a string
    pub fn provider_name(&self) -> &'static str {
        match self.provider {
            LLMProvider::OpenAI => "openai",
            LLMProvider::Ollama => "ollama",
        }
    }

    /// Check if the active provider requires an API key
    pub fn requires_api_key(&self) -> bool {
        match self.provider {
            LLMProvider::OpenAI => true,
            LLMProvider::Ollama => false,
        }
    }

    /// The model the active provider will use
    pub fn active_model(&self) -> &str {
        match self.provider {
            LLMProvider::OpenAI => &self.openai.model,
            LLMProvider::Ollama => &self.ollama.model,
        }
    }

    /// Update configuration from environment variables
    pub fn from_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "openai" => self.provider = LLMProvider::OpenAI,
                "ollama" => self.provider = LLMProvider::Ollama,
                _ => {
                    tracing::warn!("Unknown LLM provider '{provider}', using default");
                }
            }
        }

        if let Ok(model) = std::env::var("LLM_MODEL") {
            match self.provider {
                LLMProvider::OpenAI => self.openai.model = model,
                LLMProvider::Ollama => self.ollama.model = model,
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.provider {
            LLMProvider::OpenAI => {
                if self.openai.api_key.is_empty() {
                    return Err("OpenAI API key is required".to_string());
                }
            }
            LLMProvider::Ollama => {
                // No validation needed for local Ollama
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();
        assert_eq!(config.provider, LLMProvider::Ollama);
        assert_eq!(config.provider_name(), "ollama");
        assert!(!config.requires_api_key());
    }

    #[test]
    fn test_provider_serialization() {
        let provider = LLMProvider::OpenAI;
        let json = serde_json::to_string(&provider).unwrap();
        assert_eq!(json, "\"openai\"");

        let deserialized: LLMProvider = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, LLMProvider::OpenAI);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LLMConfig::default();

        // Ollama should validate without API key
        assert!(config.validate().is_ok());

        // OpenAI should require API key
        config.provider = LLMProvider::OpenAI;
        assert!(config.validate().is_err());

        config.openai.api_key = "test-key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_active_model_follows_provider() {
        let mut config = LLMConfig::default();
        config.ollama.model = "mistral:latest".to_string();
        assert_eq!(config.active_model(), "mistral:latest");

        config.provider = LLMProvider::OpenAI;
        assert_eq!(config.active_model(), config.openai.model);
    }
}
