//! Core types for LLM requests and responses.
//!
//! Provider-agnostic: backends translate these into whatever wire format
//! their provider expects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

/// A role-tagged message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    pub role: Role,
    /// The text content.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Shape Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Describes the shape a structured response must match.
///
/// The descriptor travels with the request; backends that support native
/// structured output can pass the schema through, and
/// [`crate::StructuredClient`] renders it into the system prompt for
/// backends that don't.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// A short name for the shape (e.g., "summary", "routing_decision").
    pub name: String,
    /// JSON schema describing the expected object.
    pub schema: Value,
}

impl ResponseFormat {
    /// Create a new response format descriptor.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Render the descriptor as system-prompt instructions.
    pub fn to_instructions(&self) -> String {
        format!(
            "Respond with a single JSON object named '{}' matching this JSON schema, \
             with no surrounding prose:\n{}",
            self.name, self.schema
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Completion Request / Response
// ─────────────────────────────────────────────────────────────────────────────

/// A completion request to an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use for completion.
    pub model: String,

    /// The messages in the conversation, in order.
    pub messages: Vec<Message>,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 to 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Expected response shape, if the caller wants structured output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    /// Create a new completion request with the given model and messages.
    pub fn new(model: impl Into<String>, messages: Vec<Message>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature: None,
            response_format: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the expected response shape.
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// Token usage statistics for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the input.
    pub input_tokens: u32,
    /// Tokens generated in the output.
    pub output_tokens: u32,
}

impl Usage {
    /// Create usage stats.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// A completion response from an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The model that produced the response.
    pub model: String,

    /// The generated text content.
    pub content: String,

    /// Token usage for this completion.
    #[serde(default)]
    pub usage: Usage,
}

impl CompletionResponse {
    /// Create a new completion response.
    pub fn new(model: impl Into<String>, content: impl Into<String>, usage: Usage) -> Self {
        Self {
            model: model.into(),
            content: content.into(),
            usage,
        }
    }
}
