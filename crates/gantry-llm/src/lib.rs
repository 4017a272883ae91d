//! LLM completion boundary for Gantry pipelines.
//!
//! This crate defines the narrow interfaces through which pipeline nodes
//! reach language models and prompt templates:
//!
//! - [`CompletionBackend`] — a provider-agnostic completion capability,
//!   shipped here with a [`MockBackend`] for deterministic tests. Real
//!   provider integrations implement the same trait out of tree.
//! - [`StructuredClient`] — typed structured output on top of a backend:
//!   give it role-tagged messages and a response-shape descriptor, get back
//!   a validated Rust struct. Validation retries live here, not in the
//!   pipeline engine.
//! - [`PromptSource`] / [`TemplateRegistry`] — named prompt templates with
//!   `{{path}}` variable substitution.

pub mod backend;
pub mod config;
pub mod error;
pub mod prompt;
pub mod structured;
pub mod types;

pub use backend::{CompletionBackend, MockBackend, SharedBackend, with_retry};
pub use config::LlmConfig;
pub use error::{LlmError, Result};
pub use prompt::{PromptError, PromptSource, TemplateRegistry};
pub use structured::StructuredClient;
pub use types::{CompletionRequest, CompletionResponse, Message, ResponseFormat, Role, Usage};
