//! OpenAI-compatible ReAct runtime.
//!
//! Each model turn posts the (sanitized) conversation to
//! `{base_url}/chat/completions` with streaming on, forwards every delta as a
//! [`RuntimeEvent::ModelChunk`], and accumulates tool-call fragments by
//! index. When the turn ends with tool calls, each is executed through the
//! run's [`ToolSet`] and its result appended before the next turn. A turn
//! without tool calls ends the run.

use crate::counts::ThreadMessageCounts;
use crate::normalize::content_text;
use crate::provider::{AgentRuntime, RuntimeEvent, RuntimeEventStream, RuntimeRequest};
use crate::sanitize::InputSanitizer;
use crate::stream::{DONE_MARKER, SseDecoder};
use agentgate_protocol::{
    GatewayError, GatewayResult, Message, MessageToolCall, ToolContext, ToolDefinition,
    ToolEnvelope, join_url,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

pub const MAX_TURNS: usize = 25;
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

pub struct OpenAiRuntime {
    http: reqwest::Client,
    config: OpenAiConfig,
    sanitizer: InputSanitizer,
    counts: ThreadMessageCounts,
}

impl OpenAiRuntime {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            sanitizer: InputSanitizer::default(),
            counts: ThreadMessageCounts::new(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: InputSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Share a count store so callers can read what each run recorded.
    pub fn with_counts(mut self, counts: ThreadMessageCounts) -> Self {
        self.counts = counts;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

#[async_trait]
impl AgentRuntime for OpenAiRuntime {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip_all, fields(thread_id = %request.thread_id, model = %self.config.model))]
    async fn start(&self, request: RuntimeRequest) -> GatewayResult<RuntimeEventStream> {
        let api_key = match &self.config.api_key {
            Some(key) if !key.trim().is_empty() => key.clone(),
            _ => {
                return Err(GatewayError::Configuration(
                    "OPENAI_API_KEY is not configured".to_owned(),
                ));
            }
        };
        let http = self.http.clone();
        let sanitizer = self.sanitizer.clone();
        let counts = self.counts.clone();
        let model = self.config.model.clone();
        let url = join_url(&self.config.base_url, "chat/completions");
        let RuntimeRequest {
            thread_id,
            mut messages,
            tools,
        } = request;
        let definitions = tools.definitions();
        let context = ToolContext {
            thread_id: thread_id.clone(),
        };

        let stream = try_stream! {
            let mut answered = false;
            for turn in 1..=MAX_TURNS {
                let prompt = sanitizer.apply(&messages);
                counts.record(&thread_id, messages.len(), prompt.len());
                debug!(turn, raw = messages.len(), sent = prompt.len(), "model turn");

                let body = request_body(&model, &prompt, &definitions);
                let response = post_completion(&http, &url, &api_key, &body).await?;
                let mut bytes = response.bytes_stream();
                let mut decoder = SseDecoder::new();
                let mut accumulator = TurnAccumulator::default();

                'body: while let Some(chunk) = bytes.next().await {
                    let chunk = chunk
                        .map_err(|error| GatewayError::runtime(format!("model stream failed: {error}")))?;
                    for payload in decoder.push(&chunk) {
                        if payload == DONE_MARKER {
                            break 'body;
                        }
                        if let Some(event) = accumulator.absorb(&payload)? {
                            yield event;
                        }
                    }
                }
                if let Some(payload) = decoder.finish().filter(|payload| payload != DONE_MARKER) {
                    if let Some(event) = accumulator.absorb(&payload)? {
                        yield event;
                    }
                }

                let (text, calls) = accumulator.finish(turn);
                let assistant = if calls.is_empty() {
                    Message::assistant(text)
                } else {
                    Message::assistant_with_tool_calls(text, calls.clone())
                };
                messages.push(assistant.clone());
                yield RuntimeEvent::MessageAppended(assistant);

                if calls.is_empty() {
                    answered = true;
                    break;
                }

                for call in calls {
                    let (input, envelope) = match parse_arguments(&call.arguments) {
                        Ok(arguments) => {
                            yield RuntimeEvent::ToolStarted {
                                name: call.name.clone(),
                                input: arguments.clone(),
                                call_id: Some(call.id.clone()),
                            };
                            let envelope = tools.call(&call.name, &context, arguments.clone()).await;
                            (arguments, envelope)
                        }
                        Err(error) => {
                            let input = Value::String(call.arguments.clone());
                            yield RuntimeEvent::ToolStarted {
                                name: call.name.clone(),
                                input: input.clone(),
                                call_id: Some(call.id.clone()),
                            };
                            (input, ToolEnvelope::err(error))
                        }
                    };
                    debug!(tool = %call.name, ok = envelope.ok, ?input, "tool executed");
                    let output = envelope.to_value();
                    yield RuntimeEvent::ToolFinished {
                        name: call.name.clone(),
                        output: output.clone(),
                        call_id: Some(call.id.clone()),
                    };
                    let result = Message::tool(call.id, output.to_string());
                    messages.push(result.clone());
                    yield RuntimeEvent::MessageAppended(result);
                }
            }
            if !answered {
                turn_limit_exceeded()?;
            }
        };
        Ok(Box::pin(stream))
    }
}

fn turn_limit_exceeded() -> GatewayResult<()> {
    Err(GatewayError::runtime(format!(
        "agent did not finish within {MAX_TURNS} model turns"
    )))
}

async fn post_completion(
    http: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &Value,
) -> GatewayResult<reqwest::Response> {
    let response = http
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|error| GatewayError::runtime(format!("model request failed: {error}")))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    warn!(%status, "model provider rejected request");
    Err(GatewayError::runtime(format!(
        "model provider returned {status}: {detail}"
    )))
}

fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|error| format!("invalid tool arguments: {error}"))
}

fn request_body(model: &str, messages: &[Message], tools: &[ToolDefinition]) -> Value {
    let mut body = json!({
        "model": model,
        "stream": true,
        "temperature": 0,
        "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
    });
    if !tools.is_empty() {
        body["tools"] = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();
    }
    body
}

fn wire_message(message: &Message) -> Value {
    let mut value = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });
    if !message.tool_calls.is_empty() {
        if message.content.is_empty() {
            value["content"] = Value::Null;
        }
        value["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {"name": call.name, "arguments": call.arguments},
                })
            })
            .collect();
    }
    if let Some(id) = &message.tool_call_id {
        value["tool_call_id"] = Value::String(id.clone());
    }
    value
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Value,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Debug, Default)]
struct TurnAccumulator {
    text: String,
    calls: BTreeMap<u32, PendingCall>,
}

impl TurnAccumulator {
    fn absorb(&mut self, payload: &str) -> GatewayResult<Option<RuntimeEvent>> {
        let chunk: StreamChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(error) => {
                warn!(%error, "skipping undecodable model chunk");
                return Ok(None);
            }
        };
        if let Some(error) = chunk.error {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| error.to_string());
            return Err(GatewayError::runtime(format!("model stream error: {message}")));
        }

        let mut content = Value::Null;
        let mut metadata = Map::new();
        for choice in chunk.choices {
            let delta = choice.delta;
            for fragment in delta.tool_calls.unwrap_or_default() {
                let pending = self.calls.entry(fragment.index).or_default();
                if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
                    pending.id = id;
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                        pending.name = name;
                    }
                    if let Some(arguments) = function.arguments {
                        pending.arguments.push_str(&arguments);
                    }
                }
            }
            if !delta.content.is_null() {
                self.text.push_str(&content_text(&delta.content));
                content = delta.content;
            }
            metadata.extend(
                delta
                    .extra
                    .into_iter()
                    .filter(|(key, value)| key != "role" && !value.is_null()),
            );
        }

        if content.is_null() && metadata.is_empty() {
            return Ok(None);
        }
        Ok(Some(RuntimeEvent::ModelChunk { content, metadata }))
    }

    fn finish(self, turn: usize) -> (String, Vec<MessageToolCall>) {
        let calls = self
            .calls
            .into_iter()
            .filter(|(_, call)| !call.name.is_empty())
            .map(|(index, call)| MessageToolCall {
                id: if call.id.is_empty() {
                    format!("call_{turn}_{index}")
                } else {
                    call.id
                },
                name: call.name,
                arguments: call.arguments,
            })
            .collect();
        (self.text, calls)
    }
}
