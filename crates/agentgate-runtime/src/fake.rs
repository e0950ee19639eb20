//! Deterministic trace used when the gateway runs without a model provider.

use agentgate_protocol::event::COMPACT_MAX_CHARS;
use agentgate_protocol::{AgentEvent, ThreadId, compact};
use serde_json::json;

pub const FAKE_TOOL_NAME: &str = "fake_tool";
pub const FAKE_TOOL_CALL_KEY: &str = "fake_tool_call_1";

pub fn fake_response_text(message: &str) -> String {
    let trimmed = message.trim();
    let shown = if trimmed.is_empty() {
        "(empty message)"
    } else {
        trimmed
    };
    format!(
        "Fake mode response\n\nYou said: `{shown}`\n\n```text\ntool: {FAKE_TOOL_NAME}\nstatus: ok\n```"
    )
}

pub fn fake_trace(message: &str, thread_id: &ThreadId) -> Vec<AgentEvent> {
    let key = Some(FAKE_TOOL_CALL_KEY.to_owned());
    let mut events = vec![
        AgentEvent::ThinkingStart {
            title: "Planning".to_owned(),
        },
        AgentEvent::Thinking {
            text: "Checking available tools and preparing an execution plan...".to_owned(),
        },
        AgentEvent::ThinkingEnd,
        AgentEvent::ToolStart {
            tool_name: FAKE_TOOL_NAME.to_owned(),
            input: compact(&json!({"query": message}), COMPACT_MAX_CHARS),
            correlation_key: key.clone(),
        },
        AgentEvent::ToolEnd {
            tool_name: FAKE_TOOL_NAME.to_owned(),
            output: compact(
                &json!({"ok": true, "thread_id": thread_id.as_str()}),
                COMPACT_MAX_CHARS,
            ),
            correlation_key: key,
        },
    ];
    events.extend(
        fake_response_text(message)
            .split(' ')
            .map(|word| AgentEvent::token(format!("{word} "))),
    );
    events
}
