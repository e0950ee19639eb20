//! AG-UI lifecycle translator.
//!
//! A run is framed as `RUN_STARTED`, one assistant text message, and
//! `RUN_FINISHED`. Inside the message, thinking spans and tool calls are
//! interleaved as they arrive. Before the first real event a synthetic
//! thinking span gives the client immediate feedback; it is closed as soon
//! as anything real shows up and is never opened after real thinking.
//!
//! At most one thinking span is open at any time.

use crate::correlation::ToolCallCorrelator;
use crate::sse::{WireFrame, WireStream, encode_frames};
use agentgate_protocol::{
    AgentEvent, AgentEventStream, GatewayError, GatewayResult, MessageId, RunId, ThreadId,
    ToolCallId,
};
use async_stream::stream;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::{Value, json};
use std::future::Future;
use tracing::warn;

pub const SYNTHETIC_THINKING_TITLE: &str = "Reasoning";
pub const SYNTHETIC_THINKING_TEXT: &str = "Analyzing your request and planning tool usage...";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum AguiEvent {
    RunStarted {
        thread_id: ThreadId,
        run_id: RunId,
        input: Value,
    },
    RunFinished {
        thread_id: ThreadId,
        run_id: RunId,
    },
    RunError {
        message: String,
        code: String,
    },
    TextMessageStart {
        message_id: MessageId,
        role: String,
    },
    TextMessageContent {
        message_id: MessageId,
        delta: String,
    },
    TextMessageEnd {
        message_id: MessageId,
    },
    ThinkingStart {
        title: String,
    },
    ThinkingTextMessageStart,
    ThinkingTextMessageContent {
        delta: String,
    },
    ThinkingTextMessageEnd,
    ThinkingEnd,
    ToolCallStart {
        tool_call_id: ToolCallId,
        tool_call_name: String,
        parent_message_id: MessageId,
    },
    ToolCallArgs {
        tool_call_id: ToolCallId,
        delta: String,
    },
    ToolCallEnd {
        tool_call_id: ToolCallId,
    },
    ToolCallResult {
        message_id: MessageId,
        tool_call_id: ToolCallId,
        role: String,
        tool_name: String,
        content: String,
    },
}

impl AguiEvent {
    pub fn run_error(message: impl Into<String>) -> Self {
        Self::RunError {
            message: message.into(),
            code: "server_error".to_owned(),
        }
    }
}

/// `RUN_STARTED` input with every field coerced to its expected type.
pub fn normalize_run_input(body: &Value, thread_id: &ThreadId, run_id: &RunId) -> Value {
    let list = |key: &str| match body.get(key) {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        _ => json!([]),
    };
    let object = |key: &str| match body.get(key) {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => json!({}),
    };
    json!({
        "threadId": thread_id,
        "runId": run_id,
        "messages": list("messages"),
        "tools": list("tools"),
        "context": list("context"),
        "state": object("state"),
        "forwardedProps": object("forwardedProps"),
    })
}

/// The whole answer to `agent/connect`: an empty run.
pub fn connect_events(thread_id: ThreadId, run_id: RunId) -> Vec<AguiEvent> {
    vec![
        AguiEvent::RunStarted {
            input: normalize_run_input(&Value::Null, &thread_id, &run_id),
            thread_id: thread_id.clone(),
            run_id: run_id.clone(),
        },
        AguiEvent::RunFinished { thread_id, run_id },
    ]
}

/// [`connect_events`] as wire frames.
pub fn connect_frames(thread_id: ThreadId, run_id: RunId) -> WireStream {
    let events = connect_events(thread_id, run_id).into_iter().map(Ok);
    encode_frames(futures_util::stream::iter(events).boxed(), run_error_frames, Vec::new())
}

fn run_error_frames(error: &GatewayError) -> Vec<WireFrame> {
    vec![WireFrame::json(&AguiEvent::run_error(error.to_string()))]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThinkingSpan {
    Closed,
    Synthetic,
    Real,
}

#[derive(Debug)]
pub struct AguiTranslator {
    thread_id: ThreadId,
    run_id: RunId,
    message_id: MessageId,
    correlator: ToolCallCorrelator,
    span: ThinkingSpan,
    thinking_text_open: bool,
    real_thinking_seen: bool,
}

impl AguiTranslator {
    pub fn new(thread_id: ThreadId, run_id: RunId) -> Self {
        Self {
            thread_id,
            run_id,
            message_id: MessageId::assistant(),
            correlator: ToolCallCorrelator::new(),
            span: ThinkingSpan::Closed,
            thinking_text_open: false,
            real_thinking_seen: false,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// `RUN_STARTED`, `TEXT_MESSAGE_START` and the synthetic thinking span.
    pub fn start(&mut self, input: Value) -> Vec<AguiEvent> {
        let mut out = vec![
            AguiEvent::RunStarted {
                thread_id: self.thread_id.clone(),
                run_id: self.run_id.clone(),
                input,
            },
            AguiEvent::TextMessageStart {
                message_id: self.message_id.clone(),
                role: "assistant".to_owned(),
            },
        ];
        if !self.real_thinking_seen && self.span == ThinkingSpan::Closed {
            self.span = ThinkingSpan::Synthetic;
            self.thinking_text_open = true;
            out.push(AguiEvent::ThinkingStart {
                title: SYNTHETIC_THINKING_TITLE.to_owned(),
            });
            out.push(AguiEvent::ThinkingTextMessageStart);
            out.push(AguiEvent::ThinkingTextMessageContent {
                delta: SYNTHETIC_THINKING_TEXT.to_owned(),
            });
        }
        out
    }

    pub fn push(&mut self, event: AgentEvent) -> Vec<AguiEvent> {
        let mut out = Vec::new();
        if event.is_thinking() {
            self.real_thinking_seen = true;
            if self.span == ThinkingSpan::Synthetic {
                self.close_thinking(&mut out);
            }
        } else {
            self.close_thinking(&mut out);
        }

        match event {
            AgentEvent::ThinkingStart { title } => {
                self.close_thinking(&mut out);
                self.open_thinking(title, &mut out);
            }
            AgentEvent::Thinking { text } => {
                if !text.is_empty() {
                    if self.span == ThinkingSpan::Closed {
                        self.open_thinking(SYNTHETIC_THINKING_TITLE.to_owned(), &mut out);
                    } else if !self.thinking_text_open {
                        self.thinking_text_open = true;
                        out.push(AguiEvent::ThinkingTextMessageStart);
                    }
                    out.push(AguiEvent::ThinkingTextMessageContent { delta: text });
                }
            }
            AgentEvent::ThinkingEnd => self.close_thinking(&mut out),
            AgentEvent::Token { text } => {
                if !text.is_empty() {
                    out.push(AguiEvent::TextMessageContent {
                        message_id: self.message_id.clone(),
                        delta: text,
                    });
                }
            }
            AgentEvent::ToolStart {
                tool_name,
                input,
                correlation_key,
            } => {
                let resolved = self
                    .correlator
                    .resolve_start(&tool_name, correlation_key.as_deref());
                if resolved.is_new {
                    out.push(AguiEvent::ToolCallStart {
                        tool_call_id: resolved.id.clone(),
                        tool_call_name: tool_name,
                        parent_message_id: self.message_id.clone(),
                    });
                }
                out.push(AguiEvent::ToolCallArgs {
                    tool_call_id: resolved.id.clone(),
                    delta: input,
                });
                out.push(AguiEvent::ToolCallEnd {
                    tool_call_id: resolved.id,
                });
            }
            AgentEvent::ToolEnd {
                tool_name,
                output,
                correlation_key,
            } => {
                let tool_call_id = self
                    .correlator
                    .resolve_end(&tool_name, correlation_key.as_deref());
                out.push(AguiEvent::ToolCallResult {
                    message_id: MessageId::tool_result(),
                    tool_call_id,
                    role: "tool".to_owned(),
                    content: format!("[{tool_name}] {output}"),
                    tool_name,
                });
            }
        }
        out
    }

    /// Close any open thinking span, then the message, then the run.
    pub fn finish(&mut self) -> Vec<AguiEvent> {
        let mut out = Vec::new();
        self.close_thinking(&mut out);
        out.push(AguiEvent::TextMessageEnd {
            message_id: self.message_id.clone(),
        });
        out.push(AguiEvent::RunFinished {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
        });
        out
    }

    /// Drive a whole run. The opening events go out before `start` is
    /// awaited; any failure ends the stream with a single `RUN_ERROR`.
    pub fn translate<F>(mut self, input: Value, start: F) -> BoxStream<'static, AguiEvent>
    where
        F: Future<Output = GatewayResult<AgentEventStream>> + Send + 'static,
    {
        stream! {
            for event in self.start(input) {
                yield event;
            }
            let mut events = match start.await {
                Ok(events) => events,
                Err(error) => {
                    warn!(%error, run_id = %self.run_id, "agent run failed to start");
                    yield AguiEvent::run_error(error.to_string());
                    return;
                }
            };
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => {
                        for translated in self.push(event) {
                            yield translated;
                        }
                    }
                    Err(error) => {
                        warn!(%error, run_id = %self.run_id, "agent run failed");
                        yield AguiEvent::run_error(error.to_string());
                        return;
                    }
                }
            }
            for event in self.finish() {
                yield event;
            }
        }
        .boxed()
    }

    /// [`translate`](Self::translate) as wire frames. An event that cannot
    /// be encoded ends the stream with `RUN_ERROR`.
    pub fn frames<F>(self, input: Value, start: F) -> WireStream
    where
        F: Future<Output = GatewayResult<AgentEventStream>> + Send + 'static,
    {
        let events = self.translate(input, start).map(Ok).boxed();
        encode_frames(events, run_error_frames, Vec::new())
    }

    fn open_thinking(&mut self, title: String, out: &mut Vec<AguiEvent>) {
        self.span = ThinkingSpan::Real;
        self.thinking_text_open = true;
        out.push(AguiEvent::ThinkingStart { title });
        out.push(AguiEvent::ThinkingTextMessageStart);
    }

    fn close_thinking(&mut self, out: &mut Vec<AguiEvent>) {
        if self.thinking_text_open {
            self.thinking_text_open = false;
            out.push(AguiEvent::ThinkingTextMessageEnd);
        }
        if self.span != ThinkingSpan::Closed {
            self.span = ThinkingSpan::Closed;
            out.push(AguiEvent::ThinkingEnd);
        }
    }
}
