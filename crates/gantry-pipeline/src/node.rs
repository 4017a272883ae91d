//! Node behavior: the [`Node`] trait and the built-in adapters.
//!
//! A node receives a read-only view of the run's [`TaskContext`] and
//! produces an output value; the engine records that value under the node's
//! identifier. Routers additionally name which declared connection to take
//! next — as an identifier, never an instance, so routing decisions stay
//! serializable and loggable.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::TaskContext;
use crate::error::NodeError;

/// What a node produced.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// A plain output value; the successor (if any) comes from the schema.
    Output(Value),

    /// A routing decision: record `output` and continue at `selected`.
    ///
    /// Only routers may return this. `selected` must be one of the node's
    /// declared connections; the engine aborts the run otherwise.
    Route { selected: String, output: Value },
}

/// A unit of pipeline work.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute against the current run state.
    ///
    /// Implementations read prior outputs through `ctx` and return their own
    /// output; they never write to the context directly.
    async fn process(&self, ctx: &TaskContext) -> Result<NodeOutcome, NodeError>;

    /// Whether a failure in this node should abort the whole run instead of
    /// being recorded and skipped past.
    fn fail_fast(&self) -> bool {
        false
    }
}

/// Adapter turning a plain closure into a [`Node`].
///
/// The closure is synchronous; nodes that need to await something implement
/// [`Node`] directly.
pub struct FnNode<F>
where
    F: Fn(&TaskContext) -> Result<NodeOutcome, NodeError> + Send + Sync,
{
    f: F,
    fail_fast: bool,
}

impl<F> FnNode<F>
where
    F: Fn(&TaskContext) -> Result<NodeOutcome, NodeError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f, fail_fast: false }
    }

    /// Abort the run if this node fails.
    pub fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }
}

#[async_trait]
impl<F> Node for FnNode<F>
where
    F: Fn(&TaskContext) -> Result<NodeOutcome, NodeError> + Send + Sync,
{
    async fn process(&self, ctx: &TaskContext) -> Result<NodeOutcome, NodeError> {
        (self.f)(ctx)
    }

    fn fail_fast(&self) -> bool {
        self.fail_fast
    }
}

/// A predicate-table router.
///
/// Evaluates its routes in declaration order and selects the first whose
/// predicate matches; if none match, it selects the fallback. Routes built
/// this way always produce a decision, so a run through a `RouterNode` never
/// aborts on a missing selection.
pub struct RouterNode {
    routes: Vec<Route>,
    fallback: String,
}

struct Route {
    target: String,
    predicate: Box<dyn Fn(&TaskContext) -> bool + Send + Sync>,
}

impl RouterNode {
    /// Create a router that selects `fallback` when no predicate matches.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            routes: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Add a route, evaluated in insertion order.
    pub fn route<P>(mut self, target: impl Into<String>, predicate: P) -> Self
    where
        P: Fn(&TaskContext) -> bool + Send + Sync + 'static,
    {
        self.routes.push(Route {
            target: target.into(),
            predicate: Box::new(predicate),
        });
        self
    }

    fn select(&self, ctx: &TaskContext) -> &str {
        for route in &self.routes {
            if (route.predicate)(ctx) {
                return &route.target;
            }
        }
        &self.fallback
    }
}

#[async_trait]
impl Node for RouterNode {
    async fn process(&self, ctx: &TaskContext) -> Result<NodeOutcome, NodeError> {
        let selected = self.select(ctx).to_string();
        Ok(NodeOutcome::Route {
            output: json!({"selected": selected}),
            selected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_types::Event;

    fn ctx_with(node_id: &str, output: Value) -> TaskContext {
        let mut ctx = TaskContext::new(Event::new("test", json!({})));
        ctx.record(node_id, output);
        ctx
    }

    #[tokio::test]
    async fn test_fn_node_output() {
        let node = FnNode::new(|_ctx| Ok(NodeOutcome::Output(json!({"ok": true}))));
        let ctx = TaskContext::new(Event::new("test", json!({})));
        let outcome = node.process(&ctx).await.unwrap();
        assert_eq!(outcome, NodeOutcome::Output(json!({"ok": true})));
        assert!(!node.fail_fast());
    }

    #[tokio::test]
    async fn test_fn_node_reads_prior_output() {
        let node = FnNode::new(|ctx| {
            let text = ctx
                .field("extract", "text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| NodeError::processing("extract output missing"))?;
            Ok(NodeOutcome::Output(json!({"length": text.len()})))
        });

        let ctx = ctx_with("extract", json!({"text": "hello"}));
        let outcome = node.process(&ctx).await.unwrap();
        assert_eq!(outcome, NodeOutcome::Output(json!({"length": 5})));

        let empty = TaskContext::new(Event::new("test", json!({})));
        assert!(node.process(&empty).await.is_err());
    }

    #[test]
    fn test_fn_node_fail_fast_flag() {
        let node =
            FnNode::new(|_ctx| Ok(NodeOutcome::Output(json!(null)))).with_fail_fast();
        assert!(node.fail_fast());
    }

    #[tokio::test]
    async fn test_router_first_match_wins() {
        let router = RouterNode::new("fallback")
            .route("summarize", |ctx| ctx.output("a").is_some())
            .route("translate", |_ctx| true);

        let ctx = ctx_with("a", json!(1));
        let outcome = router.process(&ctx).await.unwrap();
        match outcome {
            NodeOutcome::Route { selected, output } => {
                assert_eq!(selected, "summarize");
                assert_eq!(output, json!({"selected": "summarize"}));
            }
            other => panic!("Expected Route, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_router_falls_back() {
        let router = RouterNode::new("fallback").route("never", |_ctx| false);
        let ctx = TaskContext::new(Event::new("test", json!({})));
        let outcome = router.process(&ctx).await.unwrap();
        assert!(
            matches!(outcome, NodeOutcome::Route { selected, .. } if selected == "fallback")
        );
    }

    #[tokio::test]
    async fn test_router_deterministic_on_fixed_context() {
        let router = RouterNode::new("fallback")
            .route("left", |ctx| ctx.output("a").is_some())
            .route("right", |ctx| ctx.output("b").is_some());
        let ctx = ctx_with("b", json!(1));

        for _ in 0..5 {
            let outcome = router.process(&ctx).await.unwrap();
            assert!(
                matches!(outcome, NodeOutcome::Route { selected, .. } if selected == "right")
            );
        }
    }

    #[tokio::test]
    async fn test_router_routes_on_event_payload() {
        let router = RouterNode::new("default_flow").route("summarize", |ctx| {
            ctx.event().payload_field("action").and_then(|v| v.as_str())
                == Some("summarize")
        });

        let ctx = TaskContext::new(Event::new("test", json!({"action": "summarize"})));
        let outcome = router.process(&ctx).await.unwrap();
        assert!(
            matches!(outcome, NodeOutcome::Route { selected, .. } if selected == "summarize")
        );
    }
}
