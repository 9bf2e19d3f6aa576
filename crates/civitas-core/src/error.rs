//! Error types for Civitas

use thiserror::Error;

/// Main error type for Civitas operations
#[derive(Error, Debug)]
pub enum Error {
    /// Document could not be read or parsed
    #[error("Document error: {0}")]
    Document(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    LLMProvider(String),

    /// LLM response did not match the expected annotation schema
    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    /// Rate limit errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The process-wide cost ceiling has been reached
    #[error("Budget exceeded: spent ${spent_usd:.4} of ${limit_usd:.4} limit")]
    BudgetExceeded {
        /// Total spend so far in USD
        spent_usd: f64,
        /// Configured ceiling in USD
        limit_usd: f64,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Civitas operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a document error
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Create an LLM provider error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::LLMProvider(msg.into())
    }

    /// Create a schema validation error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaValidation(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Check if this is a transient error that can be retried.
    ///
    /// Malformed LLM responses are treated the same as transient API
    /// failures: the call is retried up to the configured bound.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LLMProvider(_) | Self::SchemaValidation(_) | Self::RateLimit(_) | Self::Timeout(_)
        )
    }

    /// Check if this error marks budget exhaustion
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. })
    }
}
