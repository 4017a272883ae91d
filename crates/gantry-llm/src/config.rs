//! Configuration for the LLM boundary.

use crate::error::{LlmError, Result};

/// Settings for completions issued through [`crate::StructuredClient`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier passed to the backend.
    pub model: String,

    /// Maximum tokens to generate per completion.
    pub max_tokens: u32,

    /// Sampling temperature. Structured output generally wants this low.
    pub temperature: Option<f32>,

    /// How many times a completion is re-issued when the response fails
    /// shape validation (0 = single attempt).
    pub validation_retries: u32,

    /// How many times a transient transport failure is retried with
    /// exponential backoff (0 = single attempt).
    pub network_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 1024,
            temperature: Some(0.0),
            validation_retries: 2,
            network_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Create a config for the given model with default knobs.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Load configuration from `GANTRY_*` environment variables.
    ///
    /// - `GANTRY_LLM_MODEL` (required)
    /// - `GANTRY_LLM_MAX_TOKENS` (default 1024)
    /// - `GANTRY_LLM_TEMPERATURE` (default 0.0)
    /// - `GANTRY_LLM_VALIDATION_RETRIES` (default 2)
    /// - `GANTRY_LLM_NETWORK_RETRIES` (default 2)
    pub fn from_env() -> Result<Self> {
        let model = std::env::var("GANTRY_LLM_MODEL")
            .map_err(|_| LlmError::Config("GANTRY_LLM_MODEL is not set".into()))?;

        let mut config = Self::for_model(model);

        if let Ok(v) = std::env::var("GANTRY_LLM_MAX_TOKENS") {
            config.max_tokens = v
                .parse()
                .map_err(|_| LlmError::Config(format!("invalid GANTRY_LLM_MAX_TOKENS: {v}")))?;
        }
        if let Ok(v) = std::env::var("GANTRY_LLM_TEMPERATURE") {
            let t: f32 = v
                .parse()
                .map_err(|_| LlmError::Config(format!("invalid GANTRY_LLM_TEMPERATURE: {v}")))?;
            config.temperature = Some(t);
        }
        if let Ok(v) = std::env::var("GANTRY_LLM_VALIDATION_RETRIES") {
            config.validation_retries = v.parse().map_err(|_| {
                LlmError::Config(format!("invalid GANTRY_LLM_VALIDATION_RETRIES: {v}"))
            })?;
        }
        if let Ok(v) = std::env::var("GANTRY_LLM_NETWORK_RETRIES") {
            config.network_retries = v.parse().map_err(|_| {
                LlmError::Config(format!("invalid GANTRY_LLM_NETWORK_RETRIES: {v}"))
            })?;
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(LlmError::Config("model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(LlmError::Config("max_tokens must be positive".into()));
        }
        Ok(())
    }
}
