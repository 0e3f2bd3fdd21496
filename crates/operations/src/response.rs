//! The JSON envelope every operation prints.

use serde::Serialize;
use serde_json::{Map, Value};

use resolve_bridge_common::{BridgeError, BridgeResult};

/// Printed when the envelope itself cannot be serialized.
pub const FALLBACK_LINE: &str = r#"{"ok":false,"error":"Unknown error occurred"}"#;

/// `{ok, error?, <operation fields>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Response {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
            fields: Map::new(),
        }
    }

    pub fn failure(err: &BridgeError) -> Self {
        Self {
            ok: false,
            error: Some(err.to_string()),
            fields: Map::new(),
        }
    }

    pub fn from_result(result: BridgeResult<Response>) -> Self {
        result.unwrap_or_else(|e| Self::failure(&e))
    }

    /// Add an operation-specific field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Single-line JSON, or [`FALLBACK_LINE`] if serialization fails.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize response");
            FALLBACK_LINE.to_string()
        })
    }
}
