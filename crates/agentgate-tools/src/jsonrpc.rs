//! JSON-RPC 2.0 framing for tool servers.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    /// Build a request with a fresh random id.
    pub fn new(method: &str, params: Value) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), method, params)
    }

    pub fn with_id(id: impl Into<String>, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: id.into(),
            method: method.to_owned(),
            params: if params.is_null() { json!({}) } else { params },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl JsonRpcResponse {
    pub fn is_v2(&self) -> bool {
        self.jsonrpc.as_deref() == Some(JSONRPC_VERSION)
    }

    /// The `error` member, if present and not empty.
    pub fn remote_error(&self) -> Option<&Value> {
        self.error.as_ref().filter(|error| match error {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::String(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        })
    }

    /// Number of entries in `result.tools`, when the result is a tool listing.
    pub fn tools_count(&self) -> Option<usize> {
        self.result
            .as_ref()?
            .get("tools")?
            .as_array()
            .map(Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_null_params_to_object() {
        let request = JsonRpcRequest::new("tools/list", Value::Null);
        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.params, json!({}));
        assert_eq!(request.id.len(), 36);
    }

    #[test]
    fn empty_error_members_are_not_errors() {
        let empty: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "1", "result": {}, "error": {}}))
                .unwrap();
        assert!(empty.remote_error().is_none());

        let failed: JsonRpcResponse = serde_json::from_value(
            json!({"jsonrpc": "2.0", "id": "1", "error": {"code": -32601, "message": "nope"}}),
        )
        .unwrap();
        assert_eq!(failed.remote_error().unwrap()["code"], -32601);
    }

    #[test]
    fn tools_count_reads_listing() {
        let response: JsonRpcResponse = serde_json::from_value(
            json!({"jsonrpc": "2.0", "result": {"tools": [{"name": "a"}, {"name": "b"}]}}),
        )
        .unwrap();
        assert!(response.is_v2());
        assert_eq!(response.tools_count(), Some(2));
    }
}
