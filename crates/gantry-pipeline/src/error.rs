//! Error types for the pipeline engine.

use thiserror::Error;

/// Errors detected when a pipeline schema is constructed.
///
/// All of these are fatal to startup: a pipeline whose schema fails
/// validation is never registered, so no run can observe a malformed graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The same node identifier was declared more than once.
    #[error("duplicate node declaration: {node}")]
    DuplicateNode { node: String },

    /// A connection references a node that was never declared.
    #[error("node '{node}' connects to unknown node '{target}'")]
    UnknownConnection { node: String, target: String },

    /// The start node is not among the declared nodes.
    #[error("start node '{0}' is not declared")]
    StartNotDeclared(String),

    /// A non-router node has more than one outgoing connection.
    #[error("non-router node '{node}' has {count} outgoing connections, expected at most one")]
    AmbiguousConnections { node: String, count: usize },

    /// The connection graph contains a cycle; the named node is part of it.
    #[error("cycle detected through node '{node}'")]
    Cycle { node: String },

    /// A declared node cannot be reached from the start node.
    #[error("node '{node}' is unreachable from the start node")]
    Unreachable { node: String },

    /// A declared node has no registered implementation.
    #[error("node '{node}' is declared but has no implementation")]
    MissingImplementation { node: String },

    /// An implementation was registered for an undeclared node.
    #[error("implementation registered for undeclared node '{node}'")]
    UnknownImplementation { node: String },
}

/// Errors produced by an individual node while a pipeline runs.
///
/// `Processing` is the node's own business logic failing; `Capability` is a
/// called external dependency (LLM, prompt source, storage) failing or
/// timing out. The engine records either kind as the node's context entry —
/// the distinction matters to downstream nodes deciding how to react.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node's business logic failed.
    #[error("processing failed: {0}")]
    Processing(String),

    /// A called external capability failed or timed out.
    #[error("external capability failed: {0}")]
    Capability(String),
}

impl NodeError {
    /// Create a processing error.
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    /// Create a capability error.
    pub fn capability(message: impl Into<String>) -> Self {
        Self::Capability(message.into())
    }
}

impl From<gantry_llm::LlmError> for NodeError {
    fn from(err: gantry_llm::LlmError) -> Self {
        NodeError::Capability(err.to_string())
    }
}

impl From<gantry_llm::PromptError> for NodeError {
    fn from(err: gantry_llm::PromptError) -> Self {
        NodeError::Capability(err.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Processing(err.to_string())
    }
}

/// Errors detected when the pipeline registry is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No default pipeline was configured.
    #[error("no default pipeline configured")]
    MissingDefault,

    /// The configured default names an unregistered pipeline.
    #[error("default pipeline '{0}' is not registered")]
    UnknownDefault(String),

    /// A dispatch rule targets an unregistered pipeline.
    #[error("route for event type '{event_type}' targets unregistered pipeline '{pipeline}'")]
    UnknownRoute {
        event_type: String,
        pipeline: String,
    },
}
