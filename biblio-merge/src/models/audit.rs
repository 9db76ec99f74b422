//! Audit trail data model
//!
//! An [`AuditTrail`] is the ordered log of automated decisions taken on one
//! record. Events are only ever appended, and appending consumes the trail and
//! hands back a new one, so a stage cannot rewrite a trail it was given.
//!
//! # Serialized shape
//!
//! Downstream stats and export consumers read events as
//! `{"actor", "step_code", "result", "before"?, "after"?}`. Optional values
//! are omitted when absent. The trail serializes as a plain JSON array.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One automated decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(rename = "actor")]
    pub actor_name: String,
    pub step_code: String,
    pub result: bool,
    #[serde(rename = "before", default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<Value>,
    #[serde(rename = "after", default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

impl AuditEvent {
    pub fn new(actor_name: impl Into<String>, step_code: impl Into<String>, result: bool) -> Self {
        Self {
            actor_name: actor_name.into(),
            step_code: step_code.into(),
            result,
            initial_value: None,
            new_value: None,
        }
    }

    /// Attach the value seen before the step; empty values are dropped
    pub fn with_initial_value(mut self, value: Value) -> Self {
        self.initial_value = non_empty(value);
        self
    }

    /// Attach the value written by the step; empty values are dropped
    pub fn with_new_value(mut self, value: Value) -> Self {
        self.new_value = non_empty(value);
        self
    }
}

fn non_empty(value: Value) -> Option<Value> {
    let empty = match &value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    (!empty).then_some(value)
}

/// Ordered, append-only sequence of [`AuditEvent`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning the extended trail
    #[must_use]
    pub fn with_event(mut self, event: AuditEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Append a plain pass/fail event
    #[must_use]
    pub fn record(self, actor_name: &str, step_code: &str, result: bool) -> Self {
        self.with_event(AuditEvent::new(actor_name, step_code, result))
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditEvent> {
        self.events.iter()
    }

    /// Result of the earliest matching event ("first hit wins")
    pub fn first_result(&self, actor_name: &str, step_code: &str) -> Option<bool> {
        self.events
            .iter()
            .find(|e| e.actor_name == actor_name && e.step_code == step_code)
            .map(|e| e.result)
    }

    /// Result of the latest matching event ("last hit wins")
    pub fn last_result(&self, actor_name: &str, step_code: &str) -> Option<bool> {
        self.events
            .iter()
            .rev()
            .find(|e| e.actor_name == actor_name && e.step_code == step_code)
            .map(|e| e.result)
    }

    /// Events appended by one actor, in order
    pub fn events_for<'a>(&'a self, actor_name: &'a str) -> impl Iterator<Item = &'a AuditEvent> + 'a {
        self.events.iter().filter(move |e| e.actor_name == actor_name)
    }

    /// Actor names in event order, consecutive repeats collapsed
    pub fn actor_sequence(&self) -> Vec<&str> {
        let mut actors: Vec<&str> = Vec::new();
        for event in &self.events {
            if actors.last() != Some(&event.actor_name.as_str()) {
                actors.push(&event.actor_name);
            }
        }
        actors
    }
}

impl<'a> IntoIterator for &'a AuditTrail {
    type Item = &'a AuditEvent;
    type IntoIter = std::slice::Iter<'a, AuditEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
