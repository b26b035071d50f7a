//! Input and domain events forwarded to behaviors

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use void_script::{SerializableValue, Value};

/// Field carrying the event kind in the script-side object
pub const KIND_FIELD: &str = "kind";

/// Catch-all handler for kinds without a specific one
pub const CATCH_ALL_HANDLER: &str = "on_event";

/// An event dispatched to every active behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    kind: String,
    fields: BTreeMap<String, SerializableValue>,
}

impl Event {
    /// Create an event without payload
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a payload field
    ///
    /// The `kind` field name is reserved and ignored here.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if name != KIND_FIELD {
            self.fields
                .insert(name, SerializableValue::from(&value.into()));
        }
        self
    }

    /// Event kind
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Payload field by name
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned().map(Value::from)
    }

    /// Name of the handler for this kind
    pub fn handler_name(&self) -> String {
        format!("on_{}", self.kind)
    }

    /// Script-side representation: an object with `kind` plus the payload
    pub fn to_value(&self) -> Value {
        let mut object: HashMap<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        object.insert(KIND_FIELD.to_string(), Value::String(self.kind.clone()));
        Value::Object(object)
    }
}

/// Whether a script value has the shape of an event
pub fn is_event_value(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if matches!(obj.get(KIND_FIELD), Some(Value::String(_))))
}
