//! Pipeline assembly and execution.
//!
//! A [`Pipeline`] binds a validated [`PipelineSchema`] to one [`Node`]
//! implementation per declared node; [`PipelineBuilder`] checks the binding
//! is total at build time. Execution is a plain loop from the start node:
//! each hop either comes from the schema (non-routers) or from the node's
//! own routing decision (routers). The DAG guarantee from schema validation
//! means the loop needs no visited set and always terminates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use gantry_types::Event;

use crate::context::TaskContext;
use crate::error::SchemaError;
use crate::node::{Node, NodeOutcome};
use crate::schema::{NodeConfig, PipelineSchema};

/// Builder binding node implementations to a schema.
pub struct PipelineBuilder {
    description: String,
    start: Option<String>,
    nodes: Vec<NodeConfig>,
    implementations: HashMap<String, Arc<dyn Node>>,
}

impl PipelineBuilder {
    /// Start a builder for a pipeline with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            start: None,
            nodes: Vec::new(),
            implementations: HashMap::new(),
        }
    }

    /// Set the start node identifier.
    pub fn start(mut self, id: impl Into<String>) -> Self {
        self.start = Some(id.into());
        self
    }

    /// Declare a node and bind its implementation.
    pub fn node(mut self, config: NodeConfig, implementation: impl Node + 'static) -> Self {
        self.implementations
            .insert(config.id.clone(), Arc::new(implementation));
        self.nodes.push(config);
        self
    }

    /// Declare a node bound to an already-shared implementation.
    pub fn shared_node(mut self, config: NodeConfig, implementation: Arc<dyn Node>) -> Self {
        self.implementations.insert(config.id.clone(), implementation);
        self.nodes.push(config);
        self
    }

    /// Validate the schema and the node binding, producing a runnable
    /// pipeline.
    ///
    /// The first declared node is the start when none was set explicitly.
    pub fn build(self) -> Result<Pipeline, SchemaError> {
        let start = match self.start {
            Some(start) => start,
            None => match self.nodes.first() {
                Some(first) => first.id.clone(),
                None => return Err(SchemaError::StartNotDeclared(String::new())),
            },
        };

        let schema = PipelineSchema::new(self.description, start, self.nodes)?;

        // node()/shared_node() insert both sides together, so in practice
        // only externally-constructed maps can be partial. Check anyway.
        for node in schema.nodes() {
            if !self.implementations.contains_key(&node.id) {
                return Err(SchemaError::MissingImplementation {
                    node: node.id.clone(),
                });
            }
        }
        for id in self.implementations.keys() {
            if schema.node(id).is_none() {
                return Err(SchemaError::UnknownImplementation { node: id.clone() });
            }
        }

        debug!(
            description = schema.description(),
            start = schema.start(),
            nodes = schema.nodes().len(),
            "Built pipeline"
        );

        Ok(Pipeline {
            schema,
            implementations: self.implementations,
        })
    }
}

/// A validated, runnable pipeline.
///
/// Immutable after build; a single instance serves any number of concurrent
/// runs, each with its own [`TaskContext`].
pub struct Pipeline {
    schema: PipelineSchema,
    implementations: HashMap<String, Arc<dyn Node>>,
}

// Node implementations are opaque trait objects, so only the schema prints.
impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// The pipeline's validated schema.
    pub fn schema(&self) -> &PipelineSchema {
        &self.schema
    }

    /// Execute the pipeline for one event.
    ///
    /// Always returns the accumulated context, even when the run aborts
    /// partway; inspect [`TaskContext::run_status`] for the outcome. A
    /// node failure is recorded as that node's error entry and traversal
    /// continues, unless the node is fail-fast or a router — those abort.
    pub async fn run(&self, event: Event) -> TaskContext {
        let event_id = event.id;
        let mut ctx = TaskContext::new(event);

        info!(
            event_id = %event_id,
            pipeline = self.schema.description(),
            "Starting pipeline run"
        );

        let mut current = Some(self.schema.start().to_string());

        while let Some(node_id) = current.take() {
            // Both maps are total over the schema, checked at build time.
            let config = self.schema.node(&node_id).unwrap();
            let node = &self.implementations[&node_id];

            debug!(event_id = %event_id, node = %node_id, "Processing node");

            match node.process(&ctx).await {
                Ok(NodeOutcome::Output(output)) => {
                    if config.is_router {
                        // A router that doesn't route is a wiring bug, not
                        // something downstream nodes can recover from.
                        warn!(
                            event_id = %event_id,
                            node = %node_id,
                            "Router returned a plain output, aborting run"
                        );
                        ctx.record(&node_id, output);
                        ctx.mark_aborted(&node_id, "router produced no routing decision");
                        return ctx;
                    }
                    ctx.record(&node_id, output);
                    current = self.schema.next_of(&node_id).map(String::from);
                }
                Ok(NodeOutcome::Route { selected, output }) => {
                    if !config.is_router {
                        warn!(
                            event_id = %event_id,
                            node = %node_id,
                            selected = %selected,
                            "Non-router node attempted to route, aborting run"
                        );
                        ctx.record(&node_id, output);
                        ctx.mark_aborted(
                            &node_id,
                            &format!("non-router node selected route '{selected}'"),
                        );
                        return ctx;
                    }
                    if !config.connections.iter().any(|c| *c == selected) {
                        warn!(
                            event_id = %event_id,
                            node = %node_id,
                            selected = %selected,
                            "Router selected an undeclared connection, aborting run"
                        );
                        ctx.record(&node_id, output);
                        ctx.mark_aborted(
                            &node_id,
                            &format!("router selected undeclared connection '{selected}'"),
                        );
                        return ctx;
                    }
                    debug!(event_id = %event_id, node = %node_id, selected = %selected, "Routed");
                    ctx.record(&node_id, output);
                    current = Some(selected);
                }
                Err(err) => {
                    warn!(
                        event_id = %event_id,
                        node = %node_id,
                        error = %err,
                        "Node failed"
                    );
                    ctx.record_error(&node_id, err.to_string());

                    if config.is_router {
                        // Without a routing decision there is no next node.
                        ctx.mark_aborted(&node_id, "router failed, no route selected");
                        return ctx;
                    }
                    if node.fail_fast() {
                        ctx.mark_aborted(&node_id, "fail-fast node failed");
                        return ctx;
                    }
                    current = self.schema.next_of(&node_id).map(String::from);
                }
            }
        }

        ctx.mark_completed();
        info!(
            event_id = %event_id,
            visited = ctx.visited().len(),
            "Pipeline run completed"
        );
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunStatus;
    use crate::error::NodeError;
    use crate::node::{FnNode, RouterNode};
    use serde_json::json;

    fn passthrough(tag: &'static str) -> FnNode<impl Fn(&TaskContext) -> Result<NodeOutcome, NodeError> + Send + Sync>
    {
        FnNode::new(move |_ctx| Ok(NodeOutcome::Output(json!({"tag": tag}))))
    }

    fn failing() -> FnNode<impl Fn(&TaskContext) -> Result<NodeOutcome, NodeError> + Send + Sync>
    {
        FnNode::new(|_ctx| Err(NodeError::capability("provider down")))
    }

    #[tokio::test]
    async fn test_linear_run_visits_all_nodes() {
        let pipeline = PipelineBuilder::new("linear")
            .node(NodeConfig::new("extract").connects_to("analyze"), passthrough("e"))
            .node(NodeConfig::new("analyze").connects_to("store"), passthrough("a"))
            .node(NodeConfig::new("store"), passthrough("s"))
            .build()
            .unwrap();

        let ctx = pipeline.run(Event::new("test", json!({}))).await;

        assert_eq!(ctx.run_status(), Some(RunStatus::Completed));
        assert_eq!(ctx.output("extract").unwrap()["tag"], json!("e"));
        assert_eq!(ctx.output("analyze").unwrap()["tag"], json!("a"));
        assert_eq!(ctx.output("store").unwrap()["tag"], json!("s"));
    }

    #[tokio::test]
    async fn test_first_node_is_default_start() {
        let pipeline = PipelineBuilder::new("implicit-start")
            .node(NodeConfig::new("only"), passthrough("x"))
            .build()
            .unwrap();
        let ctx = pipeline.run(Event::new("test", json!({}))).await;
        assert!(ctx.output("only").is_some());
    }

    #[tokio::test]
    async fn test_failure_recorded_and_traversal_continues() {
        let pipeline = PipelineBuilder::new("partial")
            .node(NodeConfig::new("extract").connects_to("analyze"), passthrough("e"))
            .node(NodeConfig::new("analyze").connects_to("store"), failing())
            .node(NodeConfig::new("store"), passthrough("s"))
            .build()
            .unwrap();

        let ctx = pipeline.run(Event::new("test", json!({}))).await;

        assert_eq!(ctx.run_status(), Some(RunStatus::Completed));
        assert!(ctx.node_errored("analyze"));
        assert_eq!(
            ctx.output("analyze").unwrap()["error"],
            json!("external capability failed: provider down")
        );
        // Downstream still ran
        assert!(ctx.output("store").is_some());
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_run() {
        let pipeline = PipelineBuilder::new("fail-fast")
            .node(NodeConfig::new("extract").connects_to("store"), failing().with_fail_fast())
            .node(NodeConfig::new("store"), passthrough("s"))
            .build()
            .unwrap();

        let ctx = pipeline.run(Event::new("test", json!({}))).await;

        assert_eq!(ctx.run_status(), Some(RunStatus::Aborted));
        assert_eq!(ctx.failed_node(), Some("extract"));
        assert!(ctx.node_errored("extract"));
        assert!(ctx.output("store").is_none());
    }

    #[tokio::test]
    async fn test_router_takes_selected_branch_only() {
        let pipeline = PipelineBuilder::new("branching")
            .node(
                NodeConfig::new("classify")
                    .connects_to("summarize")
                    .connects_to("translate")
                    .router(),
                RouterNode::new("translate").route("summarize", |ctx| {
                    ctx.event().payload_field("action").and_then(|v| v.as_str())
                        == Some("summarize")
                }),
            )
            .node(NodeConfig::new("summarize"), passthrough("sum"))
            .node(NodeConfig::new("translate"), passthrough("tr"))
            .build()
            .unwrap();

        let ctx = pipeline
            .run(Event::new("test", json!({"action": "summarize"})))
            .await;

        assert_eq!(ctx.run_status(), Some(RunStatus::Completed));
        assert_eq!(
            ctx.output("classify").unwrap()["selected"],
            json!("summarize")
        );
        assert!(ctx.output("summarize").is_some());
        assert!(ctx.output("translate").is_none());

        let ctx = pipeline.run(Event::new("test", json!({"action": "other"}))).await;
        assert!(ctx.output("translate").is_some());
        assert!(ctx.output("summarize").is_none());
    }

    #[tokio::test]
    async fn test_router_selecting_undeclared_connection_aborts() {
        let pipeline = PipelineBuilder::new("bad-route")
            .node(
                NodeConfig::new("classify").connects_to("store").router(),
                FnNode::new(|_ctx| {
                    Ok(NodeOutcome::Route {
                        selected: "elsewhere".into(),
                        output: json!({"selected": "elsewhere"}),
                    })
                }),
            )
            .node(NodeConfig::new("store"), passthrough("s"))
            .build()
            .unwrap();

        let ctx = pipeline.run(Event::new("test", json!({}))).await;

        assert_eq!(ctx.run_status(), Some(RunStatus::Aborted));
        assert_eq!(ctx.failed_node(), Some("classify"));
        assert!(ctx.abort_reason().unwrap().contains("elsewhere"));
        assert!(ctx.output("store").is_none());
    }

    #[tokio::test]
    async fn test_router_plain_output_aborts() {
        let pipeline = PipelineBuilder::new("mute-router")
            .node(
                NodeConfig::new("classify").connects_to("store").router(),
                passthrough("no-decision"),
            )
            .node(NodeConfig::new("store"), passthrough("s"))
            .build()
            .unwrap();

        let ctx = pipeline.run(Event::new("test", json!({}))).await;

        assert_eq!(ctx.run_status(), Some(RunStatus::Aborted));
        assert_eq!(
            ctx.abort_reason(),
            Some("router produced no routing decision")
        );
    }

    #[tokio::test]
    async fn test_router_failure_aborts() {
        let pipeline = PipelineBuilder::new("failing-router")
            .node(
                NodeConfig::new("classify").connects_to("store").router(),
                failing(),
            )
            .node(NodeConfig::new("store"), passthrough("s"))
            .build()
            .unwrap();

        let ctx = pipeline.run(Event::new("test", json!({}))).await;

        assert_eq!(ctx.run_status(), Some(RunStatus::Aborted));
        assert!(ctx.node_errored("classify"));
        assert_eq!(ctx.abort_reason(), Some("router failed, no route selected"));
    }

    #[tokio::test]
    async fn test_non_router_routing_aborts() {
        let pipeline = PipelineBuilder::new("rogue-node")
            .node(
                NodeConfig::new("extract").connects_to("store"),
                FnNode::new(|_ctx| {
                    Ok(NodeOutcome::Route {
                        selected: "store".into(),
                        output: json!({}),
                    })
                }),
            )
            .node(NodeConfig::new("store"), passthrough("s"))
            .build()
            .unwrap();

        let ctx = pipeline.run(Event::new("test", json!({}))).await;
        assert_eq!(ctx.run_status(), Some(RunStatus::Aborted));
        assert_eq!(ctx.failed_node(), Some("extract"));
    }

    #[test]
    fn test_build_rejects_invalid_schema() {
        let err = PipelineBuilder::new("cyclic")
            .node(NodeConfig::new("a").connects_to("b"), passthrough("a"))
            .node(NodeConfig::new("b").connects_to("a").router().connects_to("c"), passthrough("b"))
            .node(NodeConfig::new("c"), passthrough("c"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Cycle { .. }));
    }

    #[test]
    fn test_pipeline_debug_shows_schema() {
        let pipeline = PipelineBuilder::new("debuggable")
            .node(NodeConfig::new("only"), passthrough("x"))
            .build()
            .unwrap();
        let rendered = format!("{pipeline:?}");
        assert!(rendered.contains("debuggable"));
        assert!(rendered.contains("only"));
    }

    #[test]
    fn test_build_rejects_empty_pipeline() {
        let err = PipelineBuilder::new("empty").build().unwrap_err();
        assert!(matches!(err, SchemaError::StartNotDeclared(_)));
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_isolated() {
        let pipeline = Arc::new(
            PipelineBuilder::new("concurrent")
                .node(
                    NodeConfig::new("echo"),
                    FnNode::new(|ctx: &TaskContext| {
                        Ok(NodeOutcome::Output(ctx.event().payload.clone()))
                    }),
                )
                .build()
                .unwrap(),
        );

        let a = tokio::spawn({
            let p = pipeline.clone();
            async move { p.run(Event::new("test", json!({"n": 1}))).await }
        });
        let b = tokio::spawn({
            let p = pipeline.clone();
            async move { p.run(Event::new("test", json!({"n": 2}))).await }
        });

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a.output("echo").unwrap()["n"], json!(1));
        assert_eq!(b.output("echo").unwrap()["n"], json!(2));
    }
}
