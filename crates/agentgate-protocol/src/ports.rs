//! Tool boundary port.
//!
//! The agent runtime only sees tools through [`AgentTool`]; device tools,
//! discovery tools and introspection tools each implement it in their own
//! crate. Traits use `async-trait` for async dyn-dispatch.

use crate::tool::{ToolContext, ToolDefinition, ToolEnvelope};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait AgentTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, context: &ToolContext, arguments: Value) -> ToolEnvelope;
}

/// Ordered, cheaply cloneable collection of tools keyed by name.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A later tool with the same name shadows the earlier one.
    pub fn with(mut self, tool: Arc<dyn AgentTool>) -> Self {
        let name = tool.definition().name;
        self.tools.retain(|existing| existing.definition().name != name);
        self.tools.push(tool);
        self
    }

    pub fn extend(self, tools: impl IntoIterator<Item = Arc<dyn AgentTool>>) -> Self {
        tools.into_iter().fold(self, Self::with)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools
            .iter()
            .find(|tool| tool.definition().name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name. Unknown names produce an error envelope.
    pub async fn call(&self, name: &str, context: &ToolContext, arguments: Value) -> ToolEnvelope {
        match self.get(name) {
            Some(tool) => tool.call(context, arguments).await,
            None => ToolEnvelope::err(format!("unknown tool: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ThreadId;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl AgentTool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.0, "echo", json!({"type": "object"}))
        }

        async fn call(&self, _context: &ToolContext, arguments: Value) -> ToolEnvelope {
            ToolEnvelope::ok(arguments)
        }
    }

    fn context() -> ToolContext {
        ToolContext {
            thread_id: ThreadId::from_string("t"),
        }
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let tools = ToolSet::new().with(Arc::new(Echo("echo")));
        let envelope = tools.call("echo", &context(), json!({"x": 1})).await;
        assert_eq!(envelope, ToolEnvelope::ok(json!({"x": 1})));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_envelope() {
        let envelope = ToolSet::new().call("missing", &context(), json!({})).await;
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("unknown tool: missing"));
    }

    #[test]
    fn same_name_replaces_previous() {
        let tools = ToolSet::new()
            .with(Arc::new(Echo("a")))
            .with(Arc::new(Echo("b")))
            .with(Arc::new(Echo("a")));
        let names: Vec<String> = tools.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
