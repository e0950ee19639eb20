//! Internal agent event taxonomy.
//!
//! One closed enum with a variant per event kind. The runtime adapter is the
//! only producer; each translator run consumes a sequence exactly once.
//! The serde shape is the `/agent/stream` wire format.

use crate::error::GatewayResult;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default cap for textual renderings of tool input and output.
pub const COMPACT_MAX_CHARS: usize = 500;

pub type AgentEventStream = BoxStream<'static, GatewayResult<AgentEvent>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Token {
        #[serde(rename = "content")]
        text: String,
    },
    ThinkingStart {
        title: String,
    },
    Thinking {
        #[serde(rename = "content")]
        text: String,
    },
    ThinkingEnd,
    ToolStart {
        tool_name: String,
        input: String,
        #[serde(rename = "tool_call_key", default)]
        correlation_key: Option<String>,
    },
    ToolEnd {
        tool_name: String,
        output: String,
        #[serde(rename = "tool_call_key", default)]
        correlation_key: Option<String>,
    },
}

impl AgentEvent {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    pub fn is_thinking(&self) -> bool {
        matches!(
            self,
            Self::ThinkingStart { .. } | Self::Thinking { .. } | Self::ThinkingEnd
        )
    }
}

/// Render a JSON value as text capped at `max_chars` characters.
///
/// Strings are used verbatim, anything else is serialized. Truncated output
/// ends with `...`.
pub fn compact(value: &Value, max_chars: usize) -> String {
    let raw = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if raw.chars().count() <= max_chars {
        return raw;
    }
    let mut truncated: String = raw.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
