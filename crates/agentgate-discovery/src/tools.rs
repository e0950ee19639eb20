use crate::network::network_info;
use crate::scanner::{ScanRequest, SubnetScanner};
use agentgate_protocol::{AgentTool, GatewayError, ToolContext, ToolDefinition, ToolEnvelope};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// The `local_network_info` and `discover_servers` agent tools.
pub fn discovery_tools(scanner: SubnetScanner) -> Vec<Arc<dyn AgentTool>> {
    vec![
        Arc::new(LocalNetworkInfoTool),
        Arc::new(DiscoverServersTool(scanner)),
    ]
}

struct LocalNetworkInfoTool;

#[async_trait]
impl AgentTool for LocalNetworkInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "local_network_info",
            "Return local network connection info and inferred subnet. Optionally pass subnet_cidr.",
            json!({
                "type": "object",
                "properties": {"subnet_cidr": {"type": "string"}}
            }),
        )
    }

    async fn call(&self, _context: &ToolContext, arguments: Value) -> ToolEnvelope {
        let subnet = arguments.get("subnet_cidr").and_then(Value::as_str);
        ToolEnvelope::from_result(network_info(subnet))
    }
}

struct DiscoverServersTool(SubnetScanner);

#[async_trait]
impl AgentTool for DiscoverServersTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "discover_servers",
            "Scan a local subnet for JSON-RPC tool servers and device REST servers. \
             Arguments: subnet_cidr(optional), ports_csv, timeout_seconds, max_hosts, \
             save(boolean to register discovered servers), name_prefix.",
            json!({
                "type": "object",
                "properties": {
                    "subnet_cidr": {"type": "string"},
                    "ports_csv": {"type": "string", "default": "80,8000,8080,8090"},
                    "timeout_seconds": {"type": "number", "default": 1.2},
                    "max_hosts": {"type": "integer", "default": 64},
                    "save": {"type": "boolean", "default": false},
                    "name_prefix": {"type": "string", "default": "discovered"}
                }
            }),
        )
    }

    async fn call(&self, _context: &ToolContext, arguments: Value) -> ToolEnvelope {
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        let result = match serde_json::from_value::<ScanRequest>(arguments) {
            Ok(request) => self.0.scan(request).await,
            Err(error) => Err(GatewayError::validation(format!(
                "invalid discover_servers arguments: {error}"
            ))),
        };
        ToolEnvelope::from_result(result)
    }
}
