//! The wire envelope.
//!
//! Every frame in either direction is one JSON object keyed by `event`. The
//! typed unions in [`crate::InboundEvent`] and [`crate::OutboundMessage`]
//! cover the known shapes; [`Envelope`] is the untyped form used for raw
//! sends and for inspecting frames that do not decode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One untyped protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Dispatch key. Always present.
    pub event: String,
    /// Instance context (or plugin UUID for plugin-wide commands).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Manifest action id, on instance-scoped inbound events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Any other top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Build `{ event, ...fields }`. An `event` key in `fields` is ignored.
    pub fn new(event: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("event");
        Self {
            event: event.into(),
            context: None,
            device: None,
            action: None,
            payload: None,
            id: None,
            extra: fields,
        }
    }

    /// Read the `event` key out of an already-parsed JSON value.
    pub fn event_of(value: &Value) -> Option<&str> {
        value.get("event").and_then(Value::as_str)
    }
}

/// The handshake frame, sent exactly once right after the transport opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationFrame {
    pub event: String,
    pub uuid: String,
}

impl RegistrationFrame {
    pub fn new(event: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            uuid: uuid.into(),
        }
    }
}
