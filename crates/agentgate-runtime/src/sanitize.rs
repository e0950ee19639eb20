//! History bounding applied before every model turn, and the optional
//! filter applied to a finished run's history.

use agentgate_protocol::{GatewayError, Message, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const SUMMARY_LINE_CHARS: usize = 240;
const SUMMARY_HEADER: &str =
    "Conversation summary for context compression. Use this only as historical context:\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStrategy {
    #[default]
    Truncate,
    Summarize,
}

impl FromStr for HistoryStrategy {
    type Err = GatewayError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "summarize" => Ok(Self::Summarize),
            other => Err(GatewayError::Configuration(format!(
                "unknown history strategy '{other}' (expected truncate or summarize)"
            ))),
        }
    }
}

impl fmt::Display for HistoryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Truncate => "truncate",
            Self::Summarize => "summarize",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizerConfig {
    pub enabled: bool,
    pub strategy: HistoryStrategy,
    pub max_messages: usize,
    pub preserve_system_messages: bool,
    pub summary_max_chars: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: HistoryStrategy::Truncate,
            max_messages: 24,
            preserve_system_messages: true,
            summary_max_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputSanitizer {
    config: SanitizerConfig,
}

impl InputSanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    pub fn apply(&self, messages: &[Message]) -> Vec<Message> {
        let config = &self.config;
        if !config.enabled || config.max_messages < 1 || messages.len() <= config.max_messages {
            return messages.to_vec();
        }
        let bounded = match config.strategy {
            HistoryStrategy::Truncate => {
                truncate(messages, config.max_messages, config.preserve_system_messages)
            }
            HistoryStrategy::Summarize => summarize(
                messages,
                config.max_messages,
                config.preserve_system_messages,
                config.summary_max_chars,
            ),
        };
        drop_orphan_tool_results(bounded)
    }
}

/// Filter for the history returned after a run. Both switches are off by
/// default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputSanitizerConfig {
    /// Clear the tool calls recorded on assistant messages.
    pub remove_tool_inputs: bool,
    /// Drop tool-result messages.
    pub remove_tool_outputs: bool,
}

impl OutputSanitizerConfig {
    pub fn enabled(&self) -> bool {
        self.remove_tool_inputs || self.remove_tool_outputs
    }

    pub fn apply(&self, messages: Vec<Message>) -> Vec<Message> {
        if !self.enabled() {
            return messages;
        }
        messages
            .into_iter()
            .filter(|message| !(self.remove_tool_outputs && message.role == Role::Tool))
            .map(|mut message| {
                if self.remove_tool_inputs && message.role == Role::Assistant {
                    message.tool_calls.clear();
                }
                message
            })
            .collect()
    }
}

fn truncate(messages: &[Message], max: usize, preserve_system: bool) -> Vec<Message> {
    if !preserve_system {
        return messages[messages.len() - max..].to_vec();
    }
    let (system, rest): (Vec<&Message>, Vec<&Message>) =
        messages.iter().partition(|message| message.role == Role::System);
    if system.len() >= max {
        return tail(&system, max).into_iter().cloned().collect();
    }
    let budget = max - system.len();
    system
        .into_iter()
        .chain(tail(&rest, budget))
        .cloned()
        .collect()
}

fn summarize(
    messages: &[Message],
    max: usize,
    preserve_system: bool,
    summary_max_chars: usize,
) -> Vec<Message> {
    let keep = max.saturating_sub(1).max(1);
    let (older, recent) = messages.split_at(messages.len() - keep);

    let mut kept: Vec<&Message> = if preserve_system {
        older
            .iter()
            .filter(|message| message.role == Role::System)
            .chain(recent.iter().filter(|message| message.role != Role::System))
            .collect()
    } else {
        recent.iter().collect()
    };
    if kept.len() > keep {
        kept = tail(&kept, keep);
    }

    let lines: Vec<String> = older
        .iter()
        .map(|message| {
            let text: String = message.content.chars().take(SUMMARY_LINE_CHARS).collect();
            format!("- {}: {text}", message.role.as_str())
        })
        .collect();
    let mut summary = lines.join("\n");
    if summary.chars().count() > summary_max_chars {
        summary = summary.chars().take(summary_max_chars).collect();
        summary.push_str("...");
    }

    std::iter::once(Message::system(format!("{SUMMARY_HEADER}{summary}")))
        .chain(kept.into_iter().cloned())
        .collect()
}

fn tail<'a>(items: &[&'a Message], count: usize) -> Vec<&'a Message> {
    items[items.len().saturating_sub(count)..].to_vec()
}

/// Drop tool results whose originating assistant call is no longer present.
fn drop_orphan_tool_results(messages: Vec<Message>) -> Vec<Message> {
    let mut issued: HashSet<String> = HashSet::new();
    messages
        .into_iter()
        .filter(|message| match message.role {
            Role::Assistant => {
                issued.extend(message.tool_calls.iter().map(|call| call.id.clone()));
                true
            }
            Role::Tool => message
                .tool_call_id
                .as_ref()
                .is_some_and(|id| issued.contains(id)),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_protocol::MessageToolCall;

    fn sanitizer(strategy: HistoryStrategy, max_messages: usize) -> InputSanitizer {
        InputSanitizer::new(SanitizerConfig {
            strategy,
            max_messages,
            ..SanitizerConfig::default()
        })
    }

    fn conversation(turns: usize) -> Vec<Message> {
        let mut messages = vec![Message::system("rules")];
        for turn in 0..turns {
            messages.push(Message::user(format!("question {turn}")));
            messages.push(Message::assistant(format!("answer {turn}")));
        }
        messages
    }

    #[test]
    fn short_histories_pass_through() {
        let messages = conversation(2);
        assert_eq!(sanitizer(HistoryStrategy::Truncate, 24).apply(&messages), messages);
    }

    #[test]
    fn truncate_keeps_system_and_most_recent() {
        let bounded = sanitizer(HistoryStrategy::Truncate, 3).apply(&conversation(5));
        let contents: Vec<&str> = bounded.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["rules", "question 4", "answer 4"]);
    }

    #[test]
    fn truncate_without_preservation_is_a_plain_tail() {
        let config = SanitizerConfig {
            max_messages: 2,
            preserve_system_messages: false,
            ..SanitizerConfig::default()
        };
        let bounded = InputSanitizer::new(config).apply(&conversation(3));
        assert_eq!(bounded, vec![Message::user("question 2"), Message::assistant("answer 2")]);
    }

    #[test]
    fn summarize_replaces_older_messages() {
        let bounded = sanitizer(HistoryStrategy::Summarize, 4).apply(&conversation(4));
        assert_eq!(bounded.len(), 4);
        assert_eq!(bounded[0].role, Role::System);
        assert!(bounded[0].content.starts_with("Conversation summary"));
        assert!(bounded[0].content.contains("- user: question 0"));
        assert_eq!(bounded[1].content, "rules");
        assert_eq!(bounded[3].content, "answer 3");
    }

    #[test]
    fn summary_is_capped() {
        let config = SanitizerConfig {
            strategy: HistoryStrategy::Summarize,
            max_messages: 2,
            summary_max_chars: 20,
            ..SanitizerConfig::default()
        };
        let bounded = InputSanitizer::new(config).apply(&conversation(10));
        let summary = bounded[0].content.trim_start_matches(SUMMARY_HEADER);
        assert_eq!(summary.chars().count(), 23);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn orphaned_tool_results_are_dropped() {
        let call = MessageToolCall {
            id: "c1".into(),
            name: "list_servers".into(),
            arguments: "{}".into(),
        };
        let messages = vec![
            Message::user("hi"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool("c1", "[]"),
            Message::assistant("none registered"),
        ];
        let bounded = sanitizer(HistoryStrategy::Truncate, 2).apply(&messages);
        assert_eq!(bounded, vec![Message::assistant("none registered")]);
    }

    fn tool_round_trip() -> Vec<Message> {
        let call = MessageToolCall {
            id: "c1".into(),
            name: "list_servers".into(),
            arguments: "{}".into(),
        };
        vec![
            Message::user("hi"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool("c1", "[]"),
            Message::assistant("none registered"),
        ]
    }

    #[test]
    fn output_sanitizer_is_off_by_default() {
        let config = OutputSanitizerConfig::default();
        assert!(!config.enabled());
        assert_eq!(config.apply(tool_round_trip()), tool_round_trip());
    }

    #[test]
    fn output_sanitizer_strips_tool_calls_and_results() {
        let without_outputs = OutputSanitizerConfig {
            remove_tool_outputs: true,
            ..OutputSanitizerConfig::default()
        }
        .apply(tool_round_trip());
        assert_eq!(without_outputs.len(), 3);
        assert!(without_outputs.iter().all(|message| message.role != Role::Tool));
        assert_eq!(without_outputs[1].tool_calls.len(), 1);

        let without_inputs = OutputSanitizerConfig {
            remove_tool_inputs: true,
            ..OutputSanitizerConfig::default()
        }
        .apply(tool_round_trip());
        assert_eq!(without_inputs.len(), 4);
        assert!(without_inputs[1].tool_calls.is_empty());
        assert_eq!(without_inputs[2], Message::tool("c1", "[]"));
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("Summarize".parse::<HistoryStrategy>().unwrap(), HistoryStrategy::Summarize);
        assert!("compress".parse::<HistoryStrategy>().is_err());
    }
}
