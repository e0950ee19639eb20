//! Per-thread record of history sizes before and after sanitization.

use agentgate_protocol::{AgentTool, ThreadId, ToolContext, ToolDefinition, ToolEnvelope};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageCounts {
    pub raw_message_count: usize,
    pub sanitized_message_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadMessageCounts {
    inner: Arc<Mutex<HashMap<ThreadId, MessageCounts>>>,
}

impl ThreadMessageCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, thread_id: &ThreadId, raw: usize, sanitized: usize) {
        self.inner.lock().insert(
            thread_id.clone(),
            MessageCounts {
                raw_message_count: raw,
                sanitized_message_count: sanitized,
            },
        );
    }

    /// Counts for a thread; zeros when nothing was recorded.
    pub fn get(&self, thread_id: &ThreadId) -> MessageCounts {
        self.inner.lock().get(thread_id).copied().unwrap_or_default()
    }
}

/// Lets the agent inspect how much of its own history it was given.
pub struct AgentMessageCountTool {
    counts: ThreadMessageCounts,
}

impl AgentMessageCountTool {
    pub fn new(counts: ThreadMessageCounts) -> Self {
        Self { counts }
    }
}

#[async_trait]
impl AgentTool for AgentMessageCountTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "agent_message_count",
            "Return how many messages this conversation had before and after history sanitization.",
            json!({"type": "object", "properties": {}}),
        )
    }

    async fn call(&self, context: &ToolContext, _arguments: Value) -> ToolEnvelope {
        let counts = self.counts.get(&context.thread_id);
        ToolEnvelope::ok(json!({
            "raw_message_count": counts.raw_message_count,
            "sanitized_message_count": counts.sanitized_message_count,
            "source": "pre_sanitize",
        }))
    }
}
