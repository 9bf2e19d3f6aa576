//! Provider factory

use crate::LLMClient;
use crate::LLMConfig;
use crate::LLMProvider;
use crate::OllamaClient;
use crate::OpenAIClient;
use civitas_core::error::Error;
use civitas_core::error::Result;
use std::sync::Arc;
use tracing::info;

/// Create the configured LLM client.
///
/// The configuration is validated first, so a remote provider without an
/// API key fails here rather than on the first annotation call.
pub fn create_llm_client(config: &LLMConfig) -> Result<Arc<dyn LLMClient>> {
    config.validate().map_err(Error::Configuration)?;

    info!(
        provider = config.provider_name(),
        model = config.active_model(),
        "Creating LLM client"
    );

    match config.provider {
        LLMProvider::OpenAI => Ok(Arc::new(OpenAIClient::new(config.openai.clone())?)),
        LLMProvider::Ollama => Ok(Arc::new(OllamaClient::new(config.ollama.clone())?)),
    }
}
