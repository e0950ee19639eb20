//! Tool types: definitions, call context, and the uniform result envelope.

use crate::error::GatewayResult;
use crate::ids::ThreadId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool as advertised to the model: name, description, JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Per-run context handed to every tool invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub thread_id: ThreadId,
}

/// `{"ok":true,"data":...}` or `{"ok":false,"error":"..."}`.
///
/// Tools report failures through the envelope so a failing tool never aborts
/// the agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEnvelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolEnvelope {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn from_result<T: Serialize>(result: GatewayResult<T>) -> Self {
        match result.map(|data| serde_json::to_value(data)) {
            Ok(Ok(data)) => Self::ok(data),
            Ok(Err(error)) => Self::err(error.to_string()),
            Err(error) => Self::err(error.to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
