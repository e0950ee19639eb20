//! Conversation messages and tolerant history parsing.
//!
//! Both wire dialects send loosely-typed message arrays. Entries with an
//! unknown role or missing the fields their role requires are dropped, never
//! fatal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "system" | "developer" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool call requested by an assistant message. `arguments` is the raw
/// JSON text, as providers send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    /// Parse one loosely-typed wire entry (OpenAI or AG-UI shape).
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let role = Role::parse(object.get("role")?.as_str()?)?;
        let content = object.get("content").and_then(extract_text);

        match role {
            Role::System | Role::User => Some(Self::plain(role, content?)),
            Role::Tool => {
                let tool_call_id = object
                    .get("tool_call_id")
                    .or_else(|| object.get("toolCallId"))
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())?;
                Some(Self::tool(tool_call_id, content.unwrap_or_default()))
            }
            Role::Assistant => {
                let tool_calls = object
                    .get("tool_calls")
                    .or_else(|| object.get("toolCalls"))
                    .and_then(Value::as_array)
                    .map(|calls| calls.iter().filter_map(parse_tool_call).collect::<Vec<_>>())
                    .unwrap_or_default();
                if content.is_none() && tool_calls.is_empty() {
                    return None;
                }
                Some(Self::assistant_with_tool_calls(
                    content.unwrap_or_default(),
                    tool_calls,
                ))
            }
        }
    }
}

/// Parse a caller-supplied history, dropping malformed entries.
pub fn parse_history(values: &[Value]) -> Vec<Message> {
    values.iter().filter_map(Message::from_value).collect()
}

/// Text of the most recent user message, if it has any.
pub fn latest_user_text(history: &[Message]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .map(|message| message.content.as_str())
        .filter(|text| !text.trim().is_empty())
}

fn extract_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(text) => Some(text.as_str()),
                    Value::Object(block) => block.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .filter(|text| !text.is_empty())
                .collect();
            Some(texts.join(" "))
        }
        _ => None,
    }
}

fn parse_tool_call(value: &Value) -> Option<MessageToolCall> {
    let id = value.get("id")?.as_str()?.to_owned();
    let function = value.get("function")?;
    let name = function.get("name")?.as_str()?.to_owned();
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Null) | None => "{}".to_owned(),
        Some(other) => other.to_string(),
    };
    Some(MessageToolCall {
        id,
        name,
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_unknown_roles_and_incomplete_entries() {
        let history = parse_history(&[
            json!({"role": "user", "content": "hello"}),
            json!({"role": "narrator", "content": "ignored"}),
            json!({"role": "tool", "content": "orphan"}),
            json!({"role": "assistant"}),
            json!("not an object"),
            json!({"content": "no role"}),
        ]);
        assert_eq!(history, vec![Message::user("hello")]);
    }

    #[test]
    fn flattens_typed_content_blocks() {
        let message = Message::from_value(&json!({
            "role": "user",
            "content": [{"type": "text", "text": "turn"}, {"type": "text", "text": "on"}, {"type": "image"}]
        }))
        .unwrap();
        assert_eq!(message.content, "turn on");
    }

    #[test]
    fn reads_agui_camel_case_tool_fields() {
        let history = parse_history(&[
            json!({
                "id": "a1",
                "role": "assistant",
                "toolCalls": [{"id": "c1", "type": "function", "function": {"name": "list_servers", "arguments": "{}"}}]
            }),
            json!({"id": "t1", "role": "tool", "toolCallId": "c1", "content": "[]"}),
        ]);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].tool_calls[0].name, "list_servers");
        assert_eq!(history[1].tool_call_id.as_deref(), Some("c1"));
    }

    #[test]
    fn developer_role_maps_to_system() {
        let message = Message::from_value(&json!({"role": "developer", "content": "x"})).unwrap();
        assert_eq!(message.role, Role::System);
    }

    #[test]
    fn latest_user_text_skips_blank() {
        let history = vec![Message::user("first"), Message::assistant("reply")];
        assert_eq!(latest_user_text(&history), Some("first"));
        assert_eq!(latest_user_text(&[Message::user("  ")]), None);
        assert_eq!(latest_user_text(&[]), None);
    }
}
