//! Typed structured output on top of a completion backend.
//!
//! [`StructuredClient`] takes role-tagged messages plus a response-shape
//! descriptor and returns a validated Rust value. Models don't always comply
//! on the first try, so validation failures are retried with a fresh
//! completion up to a configured budget — that retry loop belongs here at
//! the capability boundary, never in the pipeline engine.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::backend::{SharedBackend, with_retry};
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, Message, ResponseFormat, Role};

/// Initial backoff for transient transport failures; doubles per attempt.
const NETWORK_BACKOFF: Duration = Duration::from_millis(250);

/// A client that turns completions into strongly-typed values.
#[derive(Clone)]
pub struct StructuredClient {
    backend: SharedBackend,
    config: LlmConfig,
}

impl StructuredClient {
    /// Create a new structured client over a backend.
    pub fn new(backend: SharedBackend, config: LlmConfig) -> Self {
        Self { backend, config }
    }

    /// The backend this client wraps.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Execute a completion and parse the response into `T`.
    ///
    /// The response-shape descriptor is rendered into a system message so
    /// any plain-text backend can serve structured requests. If parsing
    /// fails, the completion is retried from scratch; once the budget is
    /// spent the last parse failure surfaces as
    /// [`LlmError::ResponseValidation`].
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        messages: Vec<Message>,
        format: ResponseFormat,
    ) -> Result<T> {
        let request = self.build_request(messages, format);

        let mut last_error = None;
        for attempt in 0..=self.config.validation_retries {
            let response = self.complete_with_retry(&request).await?;
            let cleaned = strip_code_fences(&response.content);

            match serde_json::from_str::<T>(cleaned) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        backend = self.backend.name(),
                        attempt = attempt + 1,
                        error = %e,
                        "Structured response failed validation"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(LlmError::ResponseValidation(format!(
            "response did not match expected shape after {} attempts: {}",
            self.config.validation_retries + 1,
            last_error.unwrap()
        )))
    }

    /// Execute a completion and return the raw text content.
    pub async fn complete_text(&self, messages: Vec<Message>) -> Result<String> {
        let request = CompletionRequest::new(
            self.config.model.clone(),
            messages,
            self.config.max_tokens,
        );
        let response = self.complete_with_retry(&request).await?;
        Ok(response.content)
    }

    /// One completion, with transient transport failures retried per the
    /// configured budget.
    async fn complete_with_retry(
        &self,
        request: &CompletionRequest,
    ) -> Result<crate::types::CompletionResponse> {
        with_retry(
            self.config.network_retries,
            NETWORK_BACKOFF,
            self.backend.name(),
            || self.backend.complete(request.clone()),
        )
        .await
    }

    fn build_request(&self, messages: Vec<Message>, format: ResponseFormat) -> CompletionRequest {
        // Prepend the shape instructions as a system message, unless the
        // caller already supplied a system message — then append to it.
        let instructions = format.to_instructions();
        let mut messages = messages;
        match messages.iter_mut().find(|m| m.role == Role::System) {
            Some(system) => {
                system.content.push_str("\n\n");
                system.content.push_str(&instructions);
            }
            None => messages.insert(0, Message::system(instructions)),
        }

        let mut request =
            CompletionRequest::new(self.config.model.clone(), messages, self.config.max_tokens)
                .with_response_format(format);
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

/// Strip Markdown code fences from model output.
///
/// Models frequently wrap JSON in ```json ... ``` despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
