//! Schema-less document tree
//!
//! Harvested records vary in shape between sources, so a record body is kept
//! as a string-keyed JSON object tree rather than a fixed struct. Accessors
//! look up only the fields a caller needs and return `None` (or an empty
//! slice) when the field is absent or of an unexpected type.
//!
//! Paths are dot separated object keys, e.g. `"instanceOf.summary"`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record body: JSON object at the root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a value by dot path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// String at path, if present and a string
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// List at path; empty when absent or not a list
    pub fn list_at(&self, path: &str) -> &[Value] {
        match self.get(path) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// Mutable list at path, creating intermediate objects and the list
    ///
    /// A non-list value already at the path is replaced by an empty list.
    pub fn list_at_mut(&mut self, path: &str) -> &mut Vec<Value> {
        as_list_mut(self.slot_mut(path))
    }

    /// Replace the value at path, creating intermediate objects
    pub fn set(&mut self, path: &str, value: Value) {
        *self.slot_mut(path) = value;
    }

    /// Number of elements under the object at `key`
    ///
    /// Lists count their items, strings their characters, objects their keys,
    /// other scalars count as one.
    pub fn element_count(&self, key: &str) -> usize {
        match self.get(key) {
            Some(Value::Object(members)) => members.values().map(value_len).sum(),
            _ => 0,
        }
    }

    fn slot_mut(&mut self, path: &str) -> &mut Value {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = self.0.entry(first.to_string()).or_insert(Value::Null);
        for segment in segments {
            current = as_object_mut(current)
                .entry(segment.to_string())
                .or_insert(Value::Null);
        }
        current
    }
}

/// The list at `value`, replacing any non-list first
fn as_list_mut(value: &mut Value) -> &mut Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => {
            *other = Value::Array(Vec::new());
            as_list_mut(other)
        }
    }
}

/// The object at `value`, replacing any non-object first
fn as_object_mut(value: &mut Value) -> &mut Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            as_object_mut(other)
        }
    }
}

impl TryFrom<Value> for Document {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

fn value_len(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        Value::Null => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        Document::from_value(json!({
            "@id": "oai:example:1",
            "instanceOf": {
                "summary": [{"@type": "Summary", "label": "Short"}],
                "hasTitle": [{"mainTitle": "A title"}],
                "language": "swe"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_get_by_path() {
        let doc = sample();
        assert_eq!(doc.str_at("@id"), Some("oai:example:1"));
        assert_eq!(doc.str_at("instanceOf.language"), Some("swe"));
        assert!(doc.get("instanceOf.missing").is_none());
        assert!(doc.get("@id.nested").is_none());
    }

    #[test]
    fn test_list_at_handles_absent_and_mistyped() {
        let doc = sample();
        assert_eq!(doc.list_at("instanceOf.summary").len(), 1);
        assert!(doc.list_at("instanceOf.contribution").is_empty());
        assert!(doc.list_at("instanceOf.language").is_empty());
    }

    #[test]
    fn test_list_at_mut_creates_path() {
        let mut doc = Document::new();
        doc.list_at_mut("instanceOf.hasNote")
            .push(json!({"@type": "Note", "label": "x"}));
        assert_eq!(doc.list_at("instanceOf.hasNote").len(), 1);
    }

    #[test]
    fn test_mistyped_values_replaced_on_write() {
        let mut doc = sample();
        doc.list_at_mut("instanceOf.language").push(json!("eng"));
        assert_eq!(doc.list_at("instanceOf.language"), &[json!("eng")]);

        // A scalar on the way down becomes an object
        doc.set("@id.value", json!("oai:example:2"));
        assert_eq!(doc.str_at("@id.value"), Some("oai:example:2"));
        assert_eq!(doc.list_at("instanceOf.summary").len(), 1);
    }

    #[test]
    fn test_element_count() {
        let doc = sample();
        // summary: 1 item, hasTitle: 1 item, language: 3 characters
        assert_eq!(doc.element_count("instanceOf"), 5);
        assert_eq!(doc.element_count("missing"), 0);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Document::from_value(json!([1, 2])).is_none());
        assert!(Document::try_from(json!("text")).is_err());
    }
}
