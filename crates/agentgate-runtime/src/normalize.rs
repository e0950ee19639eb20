//! Raw runtime output to `AgentEvent`s.
//!
//! Reasoning arrives in several shapes depending on the provider: typed
//! content blocks (`{"type":"reasoning","text":..}`) or delta metadata
//! fields. The normalizer concatenates whatever it finds and brackets it
//! with `ThinkingStart`/`ThinkingEnd` on transitions.

use crate::provider::RuntimeEvent;
use agentgate_protocol::event::COMPACT_MAX_CHARS;
use agentgate_protocol::{AgentEvent, compact};
use serde_json::{Map, Value};

pub const REASONING_TITLE: &str = "Reasoning";

const THINKING_BLOCK_TYPES: [&str; 5] = [
    "thinking",
    "thinking_text",
    "reasoning",
    "reasoning_text",
    "reasoning_content",
];

const THINKING_METADATA_KEYS: [&str; 4] = [
    "reasoning",
    "reasoning_content",
    "thinking",
    "thinking_content",
];

#[derive(Debug, Default)]
pub struct EventNormalizer {
    thinking_open: bool,
}

impl EventNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RuntimeEvent) -> Vec<AgentEvent> {
        let mut out = Vec::new();
        match event {
            RuntimeEvent::ModelChunk { content, metadata } => {
                let thinking = thinking_text(&content, &metadata);
                if !thinking.is_empty() {
                    if !self.thinking_open {
                        self.thinking_open = true;
                        out.push(AgentEvent::ThinkingStart {
                            title: REASONING_TITLE.to_owned(),
                        });
                    }
                    out.push(AgentEvent::Thinking { text: thinking });
                }
                let text = content_text(&content);
                if !text.is_empty() {
                    self.close_thinking(&mut out);
                    out.push(AgentEvent::token(text));
                }
            }
            RuntimeEvent::ToolStarted {
                name,
                input,
                call_id,
            } => {
                self.close_thinking(&mut out);
                out.push(AgentEvent::ToolStart {
                    tool_name: name,
                    input: compact(&input, COMPACT_MAX_CHARS),
                    correlation_key: call_id.filter(|id| !id.is_empty()),
                });
            }
            RuntimeEvent::ToolFinished {
                name,
                output,
                call_id,
            } => {
                self.close_thinking(&mut out);
                out.push(AgentEvent::ToolEnd {
                    tool_name: name,
                    output: compact(&output, COMPACT_MAX_CHARS),
                    correlation_key: call_id.filter(|id| !id.is_empty()),
                });
            }
            RuntimeEvent::MessageAppended(_) => {}
        }
        out
    }

    /// Close a thinking span left open at end of stream.
    pub fn finish(&mut self) -> Option<AgentEvent> {
        let mut out = Vec::new();
        self.close_thinking(&mut out);
        out.pop()
    }

    fn close_thinking(&mut self, out: &mut Vec<AgentEvent>) {
        if self.thinking_open {
            self.thinking_open = false;
            out.push(AgentEvent::ThinkingEnd);
        }
    }
}

/// Answer text in a content value, skipping reasoning blocks.
pub fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.as_str()),
                Value::Object(block) if !is_thinking_block(block) => {
                    block.get("text").and_then(Value::as_str)
                }
                _ => None,
            })
            .collect(),
        _ => String::new(),
    }
}

/// Reasoning text from typed blocks and delta metadata.
pub fn thinking_text(content: &Value, metadata: &Map<String, Value>) -> String {
    let mut text = String::new();
    if let Value::Array(items) = content {
        for block in items.iter().filter_map(Value::as_object) {
            if is_thinking_block(block)
                && let Some(fragment) = ["text", "content", "reasoning"]
                    .iter()
                    .find_map(|key| block.get(*key).and_then(Value::as_str))
            {
                text.push_str(fragment);
            }
        }
    }
    for key in THINKING_METADATA_KEYS {
        match metadata.get(key) {
            Some(Value::String(fragment)) => text.push_str(fragment),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Some(fragment) = item
                        .get("text")
                        .or_else(|| item.get("content"))
                        .and_then(Value::as_str)
                    {
                        text.push_str(fragment);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn is_thinking_block(block: &Map<String, Value>) -> bool {
    block
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .is_some_and(|kind| THINKING_BLOCK_TYPES.contains(&kind.as_str()))
}
