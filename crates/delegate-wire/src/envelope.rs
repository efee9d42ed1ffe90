use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation kind announced by the first message of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvelopeKind {
    Recipe,
    ScriptManager,
}

impl EnvelopeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeKind::Recipe => "recipe",
            EnvelopeKind::ScriptManager => "scriptManager",
        }
    }
}

/// Message posted to a worker endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Present only on the message that opens an exchange.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EnvelopeKind>,
    /// Correlation id shared by every message of one exchange.
    pub uuid: String,
    pub data: Value,
}

impl RequestEnvelope {
    /// Opening message of a new unit of work.
    pub fn initial(kind: EnvelopeKind, uuid: impl Into<String>, data: Value) -> Self {
        Self {
            kind: Some(kind),
            uuid: uuid.into(),
            data,
        }
    }

    /// Answer to a pending callback; the worker resolves it through `uuid`.
    pub fn continuation(uuid: impl Into<String>, data: Value) -> Self {
        Self {
            kind: None,
            uuid: uuid.into(),
            data,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.kind.is_none()
    }
}
