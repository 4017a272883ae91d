//! Per-run mutable state threaded through a pipeline.
//!
//! A [`TaskContext`] is created once at run start, owns the originating
//! event, and accumulates one output entry per visited node. It is exclusive
//! to its run — nothing here is shared across concurrent runs — and the
//! whole thing serializes to nested key/value data so the caller can persist
//! it keyed by the event id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use gantry_types::Event;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// All reachable nodes along the taken path executed.
    Completed,
    /// The engine stopped early; see `failed_node`/`abort_reason`.
    Aborted,
}

const META_RUN_STATUS: &str = "run_status";
const META_FAILED_NODE: &str = "failed_node";
const META_ABORT_REASON: &str = "abort_reason";

/// The mutable state object threaded through a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    /// The event that triggered this run. Read-only.
    event: Event,

    /// Node identifier → that node's recorded output.
    nodes: HashMap<String, Value>,

    /// Free-form metadata for cross-node signaling plus the engine's run
    /// annotations.
    metadata: HashMap<String, Value>,
}

impl TaskContext {
    /// Create a fresh context wrapping an event.
    pub fn new(event: Event) -> Self {
        Self {
            event,
            nodes: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// The originating event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Record a node's output under its identifier.
    ///
    /// Keys are unique; the engine visits each node at most once on a
    /// validated DAG, so an existing entry is never overwritten in practice.
    pub fn record(&mut self, node_id: impl Into<String>, output: Value) {
        self.nodes.insert(node_id.into(), output);
    }

    /// Record a structured failure as a node's output.
    pub fn record_error(&mut self, node_id: impl Into<String>, message: impl Into<String>) {
        self.nodes.insert(
            node_id.into(),
            json!({"status": "error", "error": message.into()}),
        );
    }

    /// A node's recorded output, if it has run.
    pub fn output(&self, node_id: &str) -> Option<&Value> {
        self.nodes.get(node_id)
    }

    /// Navigate into a node's output by dot-separated path with optional
    /// array indices (`"entities[0].name"`).
    pub fn field(&self, node_id: &str, path: &str) -> Option<&Value> {
        let mut current = self.nodes.get(node_id)?;
        for part in path.split('.') {
            if let Some(bracket_start) = part.find('[')
                && let Some(bracket_end) = part.find(']')
                && bracket_end > bracket_start
            {
                let name = &part[..bracket_start];
                if !name.is_empty() {
                    current = current.get(name)?;
                }
                let index: usize = part[bracket_start + 1..bracket_end].parse().ok()?;
                current = current.get(index)?;
            } else {
                current = current.get(part)?;
            }
        }
        Some(current)
    }

    /// Whether the named node recorded an error entry.
    pub fn node_errored(&self, node_id: &str) -> bool {
        self.nodes
            .get(node_id)
            .and_then(|v| v.get("status"))
            .and_then(|s| s.as_str())
            == Some("error")
    }

    /// Identifiers of every node that has recorded an output.
    pub fn visited(&self) -> Vec<&str> {
        self.nodes.keys().map(|k| k.as_str()).collect()
    }

    /// All recorded node outputs.
    pub fn outputs(&self) -> &HashMap<String, Value> {
        &self.nodes
    }

    /// Set a metadata entry.
    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Look up a metadata entry.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Run outcome annotations (written by the engine)
    // ─────────────────────────────────────────────────────────────────────

    /// Mark the run as completed.
    pub(crate) fn mark_completed(&mut self) {
        self.set_meta(META_RUN_STATUS, json!("completed"));
    }

    /// Mark the run as aborted at the given node.
    pub(crate) fn mark_aborted(&mut self, node_id: &str, reason: &str) {
        self.set_meta(META_RUN_STATUS, json!("aborted"));
        self.set_meta(META_FAILED_NODE, json!(node_id));
        self.set_meta(META_ABORT_REASON, json!(reason));
    }

    /// How the run ended. `None` while the run is still in progress.
    pub fn run_status(&self) -> Option<RunStatus> {
        match self.meta(META_RUN_STATUS)?.as_str()? {
            "completed" => Some(RunStatus::Completed),
            "aborted" => Some(RunStatus::Aborted),
            _ => None,
        }
    }

    /// The node the run aborted at, if it aborted.
    pub fn failed_node(&self) -> Option<&str> {
        self.meta(META_FAILED_NODE)?.as_str()
    }

    /// Why the run aborted, if it aborted.
    pub fn abort_reason(&self) -> Option<&str> {
        self.meta(META_ABORT_REASON)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TaskContext {
        TaskContext::new(Event::new("test", json!({"action": "summarize"})))
    }

    #[test]
    fn test_new_context_is_empty() {
        let ctx = ctx();
        assert!(ctx.outputs().is_empty());
        assert!(ctx.run_status().is_none());
        assert_eq!(ctx.event().event_type, "test");
    }

    #[test]
    fn test_record_and_output() {
        let mut ctx = ctx();
        ctx.record("extract", json!({"text": "hello"}));
        assert_eq!(ctx.output("extract").unwrap()["text"], json!("hello"));
        assert!(ctx.output("missing").is_none());
    }

    #[test]
    fn test_record_error_shape() {
        let mut ctx = ctx();
        ctx.record_error("analyze", "model unavailable");
        let entry = ctx.output("analyze").unwrap();
        assert_eq!(entry["status"], json!("error"));
        assert_eq!(entry["error"], json!("model unavailable"));
        assert!(ctx.node_errored("analyze"));
        assert!(!ctx.node_errored("extract"));
    }

    #[test]
    fn test_field_navigation() {
        let mut ctx = ctx();
        ctx.record(
            "extract",
            json!({"entities": [{"name": "Alice"}, {"name": "Acme"}], "lang": "en"}),
        );
        assert_eq!(ctx.field("extract", "lang"), Some(&json!("en")));
        assert_eq!(
            ctx.field("extract", "entities[1].name"),
            Some(&json!("Acme"))
        );
        assert_eq!(ctx.field("extract", "entities[5].name"), None);
        assert_eq!(ctx.field("extract", "missing.path"), None);
        assert_eq!(ctx.field("never_ran", "lang"), None);
    }

    #[test]
    fn test_field_reversed_brackets_is_none() {
        let mut ctx = ctx();
        ctx.record("extract", json!({"a]b[": "odd key", "list": [1, 2]}));
        assert_eq!(ctx.field("extract", "a]b["), Some(&json!("odd key")));
        assert_eq!(ctx.field("extract", "list]0["), None);
    }

    #[test]
    fn test_success_output_not_errored() {
        let mut ctx = ctx();
        ctx.record("extract", json!({"status": "ok"}));
        assert!(!ctx.node_errored("extract"));
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut ctx = ctx();
        ctx.set_meta("trace_id", json!("abc"));
        assert_eq!(ctx.meta("trace_id"), Some(&json!("abc")));
        assert_eq!(ctx.meta("missing"), None);
    }

    #[test]
    fn test_run_annotations() {
        let mut ctx = ctx();
        ctx.mark_completed();
        assert_eq!(ctx.run_status(), Some(RunStatus::Completed));
        assert!(ctx.failed_node().is_none());

        let mut ctx = self::ctx();
        ctx.mark_aborted("router", "no route selected");
        assert_eq!(ctx.run_status(), Some(RunStatus::Aborted));
        assert_eq!(ctx.failed_node(), Some("router"));
        assert_eq!(ctx.abort_reason(), Some("no route selected"));
    }

    #[test]
    fn test_serializes_to_nested_json() {
        let mut ctx = ctx();
        ctx.record("extract", json!({"text": "hi"}));
        ctx.set_meta("trace_id", json!("abc"));
        ctx.mark_completed();

        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["nodes"]["extract"]["text"], json!("hi"));
        assert_eq!(value["metadata"]["run_status"], json!("completed"));
        assert_eq!(value["event"]["event_type"], json!("test"));

        let parsed: TaskContext = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.output("extract").unwrap()["text"], json!("hi"));
    }
}
