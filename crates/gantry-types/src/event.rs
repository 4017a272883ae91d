//! The external input that triggers a pipeline run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An externally supplied event.
///
/// The `event_type` discriminator is what the pipeline registry dispatches
/// on; the payload is opaque to the engine and only interpreted by
/// individual nodes. Events are immutable once a run starts — the engine
/// takes ownership and only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event, used by the caller to key
    /// persisted run results.
    pub id: Uuid,

    /// Type/category discriminator (e.g., "document_uploaded",
    /// "chat_message").
    pub event_type: String,

    /// Arbitrary payload. Opaque to the engine.
    pub payload: Value,

    /// Optional caller-supplied metadata (tenant, source, trace ids).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,

    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create a new event with a generated id and the current timestamp.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Look up a field in the payload by dot-separated path.
    ///
    /// Returns `None` if any segment is missing.
    pub fn payload_field(&self, path: &str) -> Option<&Value> {
        let mut current = &self.payload;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event_generates_id() {
        let a = Event::new("upload", json!({}));
        let b = Event::new("upload", json!({}));
        assert_ne!(a.id, b.id);
        assert_eq!(a.event_type, "upload");
    }

    #[test]
    fn test_with_metadata() {
        let event = Event::new("upload", json!({}))
            .with_metadata("tenant", json!("acme"))
            .with_metadata("source", json!("api"));
        assert_eq!(event.metadata["tenant"], json!("acme"));
        assert_eq!(event.metadata["source"], json!("api"));
    }

    #[test]
    fn test_payload_field_nested() {
        let event = Event::new(
            "chat",
            json!({"message": {"text": "hello", "lang": "en"}}),
        );
        assert_eq!(event.payload_field("message.text"), Some(&json!("hello")));
        assert_eq!(event.payload_field("message.missing"), None);
        assert_eq!(event.payload_field("missing"), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let event = Event::new("upload", json!({"file": "a.pdf"}))
            .with_metadata("tenant", json!("acme"));
        let serialized = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed.id, event.id);
        assert_eq!(parsed.event_type, "upload");
        assert_eq!(parsed.payload["file"], json!("a.pdf"));
        assert_eq!(parsed.metadata["tenant"], json!("acme"));
    }

    #[test]
    fn test_empty_metadata_skipped_in_json() {
        let event = Event::new("upload", json!({}));
        let serialized = serde_json::to_string(&event).unwrap();
        assert!(!serialized.contains("metadata"));
    }
}
