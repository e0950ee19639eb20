//! Device tools exposed to the agent.

use crate::client::RemoteToolClient;
use crate::registry::ServerRegistry;
use agentgate_protocol::{
    AgentTool, GatewayError, GatewayResult, ToolContext, ToolDefinition, ToolEnvelope,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared state behind the three device tools.
#[derive(Debug, Clone)]
pub struct DeviceToolkit {
    registry: ServerRegistry,
    client: RemoteToolClient,
}

impl DeviceToolkit {
    pub fn new(registry: ServerRegistry, client: RemoteToolClient) -> Self {
        Self { registry, client }
    }

    pub fn tools(&self) -> Vec<Arc<dyn AgentTool>> {
        vec![
            Arc::new(ListServersTool(self.clone())),
            Arc::new(ListServerToolsTool(self.clone())),
            Arc::new(CallServerToolTool(self.clone())),
        ]
    }

    pub async fn list_server_tools(&self, server_name: &str) -> GatewayResult<Value> {
        let config = self.registry.get(server_name)?;
        self.client.list_tools(&config).await
    }

    pub async fn call_server_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> GatewayResult<Value> {
        let config = self.registry.get(server_name)?;
        self.client.call(&config, tool_name, arguments).await
    }
}

struct ListServersTool(DeviceToolkit);
struct ListServerToolsTool(DeviceToolkit);
struct CallServerToolTool(DeviceToolkit);

#[async_trait]
impl AgentTool for ListServersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "list_servers",
            "List configured device and tool servers.",
            json!({"type": "object", "properties": {}}),
        )
    }

    async fn call(&self, _context: &ToolContext, _arguments: Value) -> ToolEnvelope {
        ToolEnvelope::from_result(Ok(self.0.registry.list()))
    }
}

#[async_trait]
impl AgentTool for ListServerToolsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "list_server_tools",
            "List tools exposed by one server, by server_name.",
            json!({
                "type": "object",
                "properties": {"server_name": {"type": "string"}},
                "required": ["server_name"]
            }),
        )
    }

    async fn call(&self, _context: &ToolContext, arguments: Value) -> ToolEnvelope {
        let result = match required_str(&arguments, "server_name") {
            Ok(server_name) => self.0.list_server_tools(server_name).await,
            Err(error) => Err(error),
        };
        ToolEnvelope::from_result(result)
    }
}

#[async_trait]
impl AgentTool for CallServerToolTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "call_server_tool",
            "Call a tool on a device server. Provide server_name, tool_name, and \
             arguments_json (JSON object string).",
            json!({
                "type": "object",
                "properties": {
                    "server_name": {"type": "string"},
                    "tool_name": {"type": "string"},
                    "arguments_json": {"type": "string", "default": "{}"}
                },
                "required": ["server_name", "tool_name"]
            }),
        )
    }

    async fn call(&self, _context: &ToolContext, arguments: Value) -> ToolEnvelope {
        let parsed = required_str(&arguments, "server_name").and_then(|server| {
            let tool = required_str(&arguments, "tool_name")?;
            Ok((server, tool, tool_arguments(&arguments)?))
        });
        let result = match parsed {
            Ok((server, tool, tool_args)) => self.0.call_server_tool(server, tool, tool_args).await,
            Err(error) => Err(error),
        };
        ToolEnvelope::from_result(result)
    }
}

fn required_str<'a>(arguments: &'a Value, key: &str) -> GatewayResult<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| GatewayError::validation(format!("'{key}' is required")))
}

fn tool_arguments(arguments: &Value) -> GatewayResult<Value> {
    match arguments.get("arguments_json") {
        None | Some(Value::Null) => Ok(json!({})),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(json!({})),
        Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|error| {
            GatewayError::validation(format!("arguments_json must be valid JSON: {error}"))
        }),
        Some(object @ Value::Object(_)) => Ok(object.clone()),
        Some(_) => Err(GatewayError::validation(
            "arguments_json must be a JSON object string",
        )),
    }
}
