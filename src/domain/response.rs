use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::LogEntry;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(
        rename = "contentType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub logs: Vec<LogEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Caller-owned render output.
///
/// `content` holds raw bytes; its serialized form is base64 text, so every
/// value that leaves the process as JSON is already wire-safe.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderResponse {
    #[serde(with = "delegate_wire::content::base64", default)]
    pub content: Vec<u8>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub meta: ResponseMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RenderResponse {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Returns a copy with the top-level fields of a wire-form `patch` applied.
    ///
    /// A `content` key in the patch is base64 and is decoded here; without one
    /// the current bytes are kept.
    pub fn merged(&self, patch: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        super::overlay(self, patch)
    }
}
