//! Error types for the LLM boundary.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for LLM operations.
///
/// `ResponseValidation` is deliberately a separate variant from
/// `Backend`/`Network`: a provider that answered successfully but with output
/// that doesn't match the requested shape is a different failure mode from a
/// provider that couldn't answer at all, and callers react differently
/// (re-prompt vs. retry/fail over).
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend/API error from the provider.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Network/connectivity error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error (model missing, bad retry budget, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The provider responded, but the content did not match the requested
    /// response shape even after the validation retry budget was spent.
    #[error("Response validation failed: {0}")]
    ResponseValidation(String),
}

impl LlmError {
    /// Returns true if this error is retryable at the transport level.
    ///
    /// Validation failures are retried separately by [`crate::StructuredClient`]
    /// with a fresh completion, not by the transport retry loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}
