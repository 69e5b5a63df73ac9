//! Wire shapes exchanged with the agent server.
//!
//! Outbound chat frames are `{"content": "..."}`. Inbound frames and upload
//! responses share one shape: an object with optional `result` and
//! `message` fields, where a non-empty `result` wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame sent over the channel for each submitted line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub content: String,
}

impl OutboundFrame {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing a single string field cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Reply payload from the agent, used by both the channel and the upload endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

impl AgentReply {
    pub fn from_result(text: impl Into<String>) -> Self {
        Self {
            result: Some(Value::String(text.into())),
            message: None,
        }
    }

    pub fn from_message(text: impl Into<String>) -> Self {
        Self {
            result: None,
            message: Some(Value::String(text.into())),
        }
    }

    /// Decode a reply body. Only JSON objects are accepted.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(raw)?;
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "expected a JSON object",
            ));
        }
        serde_json::from_value(value)
    }

    /// Text to display: `result` if it is non-empty, else `message`.
    ///
    /// Returns `None` when neither field carries a value.
    pub fn text(&self) -> Option<String> {
        let result = field_text(self.result.as_ref());
        let message = field_text(self.message.as_ref());
        match (result, message) {
            (Some(r), _) if !r.is_empty() => Some(r),
            (_, Some(m)) => Some(m),
            (r, None) => r,
        }
    }
}

fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Text for an inbound channel frame.
///
/// Frames that are not a reply object are shown verbatim behind a
/// `Received: ` prefix instead of being dropped.
pub fn frame_text(raw: &str) -> String {
    AgentReply::parse(raw.as_bytes())
        .ok()
        .and_then(|reply| reply.text())
        .unwrap_or_else(|| format!("Received: {raw}"))
}
