//! Node-graph pipeline engine for Gantry.
//!
//! Pipelines are directed acyclic graphs of nodes, declared as a
//! [`PipelineSchema`] and validated at construction: every connection must
//! target a declared node, the start node must exist, non-routers get at
//! most one outgoing edge, and the graph must be acyclic with every node
//! reachable from start. A [`Pipeline`] binds that schema to [`Node`]
//! implementations and executes runs; a [`PipelineRegistry`] dispatches
//! incoming events to pipelines by event type.
//!
//! Each run threads a [`TaskContext`] through the visited nodes: one output
//! entry per node, errors recorded in place so partial results survive. The
//! engine itself never retries — transient-failure retries belong to the
//! capability layer ([`gantry_llm`]), and a failed node simply records its
//! error unless it is fail-fast or a router.
//!
//! # Example
//!
//! ```
//! use gantry_pipeline::{FnNode, NodeConfig, NodeOutcome, PipelineBuilder};
//! use gantry_types::Event;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = PipelineBuilder::new("greeting")
//!     .node(
//!         NodeConfig::new("greet"),
//!         FnNode::new(|ctx| {
//!             let name = ctx
//!                 .event()
//!                 .payload_field("name")
//!                 .and_then(|v| v.as_str())
//!                 .unwrap_or("world");
//!             Ok(NodeOutcome::Output(json!({ "greeting": format!("hello, {name}") })))
//!         }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let ctx = pipeline.run(Event::new("greet.requested", json!({"name": "gantry"}))).await;
//! assert_eq!(ctx.output("greet").unwrap()["greeting"], json!("hello, gantry"));
//! # }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod llm;
pub mod node;
pub mod registry;
pub mod schema;

pub use context::{RunStatus, TaskContext};
pub use engine::{Pipeline, PipelineBuilder};
pub use error::{NodeError, RegistryError, SchemaError};
pub use llm::{CompletionStep, LlmNode};
pub use node::{FnNode, Node, NodeOutcome, RouterNode};
pub use registry::{PipelineRegistry, PipelineRegistryBuilder};
pub use schema::{NodeConfig, PipelineSchema};
