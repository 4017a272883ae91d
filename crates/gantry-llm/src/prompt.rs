//! Named prompt templates with variable substitution.
//!
//! Nodes ask a [`PromptSource`] for a template by name plus a variable
//! mapping and get back a rendered string. Template-not-found and render
//! errors surface to the node, which records them as its own error entry.
//!
//! # Template Syntax
//!
//! - `{{field}}` — a top-level variable
//! - `{{field.nested}}` — nested field access via dot notation
//! - `{{items[0].name}}` — array index access

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Errors from prompt resolution.
#[derive(Debug, Error)]
pub enum PromptError {
    /// No template registered under the requested name.
    #[error("prompt template not found: {0}")]
    TemplateNotFound(String),

    /// A template expression could not be resolved against the variables.
    #[error("failed to render template '{template}': {detail}")]
    Render { template: String, detail: String },

    /// Failed to load templates from disk.
    #[error("failed to load templates: {0}")]
    Load(String),
}

/// A source of named, renderable prompt templates.
pub trait PromptSource: Send + Sync {
    /// Render the named template against the given variables.
    fn render(&self, name: &str, vars: &HashMap<String, Value>) -> Result<String, PromptError>;
}

/// An in-memory template registry.
///
/// Populated in code via [`TemplateRegistry::register`] or from a directory
/// of `.md`/`.txt` files where the file stem becomes the template name.
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, String>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template body under a name. Replaces any existing entry.
    pub fn register(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(name.into(), body.into());
    }

    /// Load all `.md` and `.txt` files from a directory as templates.
    pub fn from_dir(dir: &Path) -> Result<Self, PromptError> {
        let mut registry = Self::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| PromptError::Load(format!("cannot read {}: {}", dir.display(), e)))?;

        for entry in entries {
            let entry = entry.map_err(|e| PromptError::Load(e.to_string()))?;
            let path = entry.path();
            let is_template = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext == "md" || ext == "txt");
            if !is_template {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let body = std::fs::read_to_string(&path)
                .map_err(|e| PromptError::Load(format!("cannot read {}: {}", path.display(), e)))?;
            registry.register(name, body);
        }

        tracing::debug!(
            dir = %dir.display(),
            count = registry.templates.len(),
            "Loaded prompt templates"
        );

        Ok(registry)
    }

    /// Names of all registered templates.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }
}

impl PromptSource for TemplateRegistry {
    fn render(&self, name: &str, vars: &HashMap<String, Value>) -> Result<String, PromptError> {
        let body = self
            .templates
            .get(name)
            .ok_or_else(|| PromptError::TemplateNotFound(name.to_string()))?;

        render_template(body, vars).map_err(|detail| PromptError::Render {
            template: name.to_string(),
            detail,
        })
    }
}

/// Substitute all `{{...}}` expressions in a template body.
fn render_template(body: &str, vars: &HashMap<String, Value>) -> Result<String, String> {
    let mut result = String::with_capacity(body.len());
    let mut remaining = body;

    while let Some(start) = remaining.find("{{") {
        let Some(end) = remaining[start..].find("}}") else {
            // Unclosed `{{` — emit the rest verbatim
            break;
        };
        result.push_str(&remaining[..start]);

        let path = remaining[start + 2..start + end].trim();
        if path.is_empty() {
            return Err("empty template expression".to_string());
        }
        let value = resolve_path(path, vars)
            .ok_or_else(|| format!("unknown variable '{{{{{path}}}}}'"))?;
        result.push_str(&value_to_string(value));

        remaining = &remaining[start + end + 2..];
    }
    result.push_str(remaining);

    Ok(result)
}

/// A segment of a dot-separated path, optionally with an array index.
struct PathSegment<'a> {
    name: &'a str,
    index: Option<usize>,
}

fn parse_segment(part: &str) -> PathSegment<'_> {
    // A `]` before the `[` is not an index expression; fall through and let
    // the whole segment fail to resolve.
    if let Some(bracket_start) = part.find('[')
        && let Some(bracket_end) = part.find(']')
        && bracket_end > bracket_start
    {
        let index = part[bracket_start + 1..bracket_end].parse::<usize>().ok();
        return PathSegment {
            name: &part[..bracket_start],
            index,
        };
    }
    PathSegment {
        name: part,
        index: None,
    }
}

/// Resolve a dot-separated path against the variable map.
fn resolve_path<'a>(path: &str, vars: &'a HashMap<String, Value>) -> Option<&'a Value> {
    let mut segments = path.split('.');

    let first = parse_segment(segments.next()?);
    let mut current = vars.get(first.name)?;
    if let Some(i) = first.index {
        current = current.get(i)?;
    }

    for part in segments {
        let segment = parse_segment(part);
        current = current.get(segment.name)?;
        if let Some(i) = segment.index {
            current = current.get(i)?;
        }
    }

    Some(current)
}

/// Convert a JSON value to its string representation for interpolation.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Objects and arrays get JSON serialized
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    }
}
