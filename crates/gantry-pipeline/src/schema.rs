//! Static pipeline schema and its validator.
//!
//! A [`PipelineSchema`] declares the node graph: which nodes exist, how they
//! connect, where execution starts, and which nodes are routers. Validation
//! happens exactly once, at construction — a schema that exists is a valid
//! DAG, fully reachable from start, so the runtime traversal loop carries no
//! loop guard or visited set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Static descriptor of a single node in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node identifier within the schema.
    pub id: String,

    /// Identifiers this node may transition to. At most one for non-router
    /// nodes; routers pick among theirs at runtime.
    #[serde(default)]
    pub connections: Vec<String>,

    /// Whether this node selects its own successor.
    #[serde(default)]
    pub is_router: bool,
}

impl NodeConfig {
    /// Create a node config with no connections.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connections: Vec::new(),
            is_router: false,
        }
    }

    /// Add an outgoing connection.
    pub fn connects_to(mut self, target: impl Into<String>) -> Self {
        self.connections.push(target.into());
        self
    }

    /// Mark this node as a router.
    pub fn router(mut self) -> Self {
        self.is_router = true;
        self
    }
}

/// A validated, immutable pipeline graph.
///
/// Constructed once at process startup and shared read-only by every run of
/// its pipeline type. Deserialization funnels through [`PipelineSchema::new`]
/// so a schema loaded from stored JSON is held to the same checks as one
/// built in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaDecl")]
pub struct PipelineSchema {
    description: String,
    start: String,
    nodes: Vec<NodeConfig>,
    /// Node id → position in `nodes`, built at construction.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// The raw declaration shape a schema deserializes from.
#[derive(Deserialize)]
struct SchemaDecl {
    description: String,
    start: String,
    nodes: Vec<NodeConfig>,
}

impl TryFrom<SchemaDecl> for PipelineSchema {
    type Error = SchemaError;

    fn try_from(decl: SchemaDecl) -> Result<Self, SchemaError> {
        Self::new(decl.description, decl.start, decl.nodes)
    }
}

impl PipelineSchema {
    /// Construct and validate a schema.
    ///
    /// Fails with a [`SchemaError`] naming the violated invariant: duplicate
    /// declarations, connections to unknown nodes, undeclared start,
    /// ambiguous outgoing edges on non-routers, cycles, or nodes
    /// unreachable from start.
    pub fn new(
        description: impl Into<String>,
        start: impl Into<String>,
        nodes: Vec<NodeConfig>,
    ) -> Result<Self, SchemaError> {
        let start = start.into();

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(SchemaError::DuplicateNode {
                    node: node.id.clone(),
                });
            }
        }

        for node in &nodes {
            for target in &node.connections {
                if !index.contains_key(target) {
                    return Err(SchemaError::UnknownConnection {
                        node: node.id.clone(),
                        target: target.clone(),
                    });
                }
            }
            if !node.is_router && node.connections.len() > 1 {
                return Err(SchemaError::AmbiguousConnections {
                    node: node.id.clone(),
                    count: node.connections.len(),
                });
            }
        }

        if !index.contains_key(&start) {
            return Err(SchemaError::StartNotDeclared(start));
        }

        let schema = Self {
            description: description.into(),
            start,
            nodes,
            index,
        };
        schema.check_graph()?;
        Ok(schema)
    }

    /// Depth-first traversal from start: detects back-edges (cycles) and
    /// computes the reachable set in one pass.
    fn check_graph(&self) -> Result<(), SchemaError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<&str, Color> = self
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), Color::White))
            .collect();

        // Iterative DFS: (node, index of next connection to visit).
        let mut stack: Vec<(&str, usize)> = vec![(self.start.as_str(), 0)];
        color.insert(self.start.as_str(), Color::Gray);

        while let Some((node_id, child_idx)) = stack.last_mut() {
            let node = &self.nodes[self.index[*node_id]];
            if let Some(target) = node.connections.get(*child_idx) {
                *child_idx += 1;
                match color[target.as_str()] {
                    // Back-edge into a node on the current path: that node
                    // is part of a real cycle.
                    Color::Gray => {
                        return Err(SchemaError::Cycle {
                            node: target.clone(),
                        });
                    }
                    Color::White => {
                        color.insert(target.as_str(), Color::Gray);
                        stack.push((target.as_str(), 0));
                    }
                    Color::Black => {}
                }
            } else {
                color.insert(node_id, Color::Black);
                stack.pop();
            }
        }

        // Anything still white was never reached from start.
        for node in &self.nodes {
            if color[node.id.as_str()] == Color::White {
                return Err(SchemaError::Unreachable {
                    node: node.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Human-readable description of this pipeline.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The identifier of the start node.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Look up a node's config by identifier.
    pub fn node(&self, id: &str) -> Option<&NodeConfig> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// The single static successor of a non-router node, if any.
    ///
    /// Routers choose their successor at runtime, not through this.
    pub fn next_of(&self, id: &str) -> Option<&str> {
        let node = self.node(id)?;
        if node.is_router {
            return None;
        }
        node.connections.first().map(|s| s.as_str())
    }

    /// All declared node configs, in declaration order.
    pub fn nodes(&self) -> &[NodeConfig] {
        &self.nodes
    }
}
