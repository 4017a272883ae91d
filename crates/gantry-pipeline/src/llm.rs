//! LLM-backed pipeline nodes.
//!
//! A [`CompletionStep`] describes one typed model call: how to derive its
//! input from the run state, which messages to send, and what shape the
//! response must match. [`LlmNode`] wraps a step plus a
//! [`StructuredClient`] into a [`Node`], so model calls slot into a schema
//! like any other node. Validation retries live inside the client; by the
//! time an error reaches the engine it is final.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use gantry_llm::{Message, ResponseFormat, StructuredClient};

use crate::context::TaskContext;
use crate::error::NodeError;
use crate::node::{Node, NodeOutcome};

/// One typed completion call in a pipeline.
pub trait CompletionStep: Send + Sync {
    /// Input assembled from the run state.
    type Request: Serialize + Send;

    /// The shape the model's answer must parse into.
    type Response: DeserializeOwned + Serialize + Send;

    /// Build this step's input from prior outputs and the event.
    ///
    /// Failing here is a processing error: a prerequisite output is missing
    /// or malformed.
    fn derive_request(&self, ctx: &TaskContext) -> Result<Self::Request, NodeError>;

    /// The messages to send for this request.
    ///
    /// Steps that render prompts from a template source can fail here, e.g.
    /// on a missing template; that surfaces as the node's error entry.
    fn messages(&self, request: &Self::Request) -> Result<Vec<Message>, NodeError>;

    /// The response-shape descriptor for this step.
    fn response_format(&self) -> ResponseFormat;

    /// Whether a failure in this step aborts the run.
    fn fail_fast(&self) -> bool {
        false
    }
}

/// Adapter running a [`CompletionStep`] as a pipeline [`Node`].
pub struct LlmNode<S: CompletionStep> {
    step: S,
    client: StructuredClient,
}

impl<S: CompletionStep> LlmNode<S> {
    pub fn new(step: S, client: StructuredClient) -> Self {
        Self { step, client }
    }
}

#[async_trait]
impl<S: CompletionStep> Node for LlmNode<S> {
    async fn process(&self, ctx: &TaskContext) -> Result<NodeOutcome, NodeError> {
        let request = self.step.derive_request(ctx)?;
        let messages = self.step.messages(&request)?;
        let format = self.step.response_format();

        tracing::debug!(
            backend = self.client.backend_name(),
            format = %format.name,
            "Executing completion step"
        );

        let response: S::Response = self
            .client
            .complete_structured(messages, format)
            .await?;

        let output: Value = serde_json::to_value(response)?;
        Ok(NodeOutcome::Output(output))
    }

    fn fail_fast(&self) -> bool {
        self.step.fail_fast()
    }
}
