//! Chat-completion translator.
//!
//! Emits `role chunk → content chunk* → stop chunk → [DONE]`. Only token
//! events have a representation here; thinking and tool events are dropped.
//! A failure at any point becomes one error chunk followed by `[DONE]`.

use crate::sse::{WireFrame, WireStream, encode_frames};
use agentgate_protocol::{AgentEvent, AgentEventStream, GatewayResult, MessageId, ThreadId};
use async_stream::stream;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::{Value, json};
use std::future::Future;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionChunk {
    pub id: MessageId,
    pub object: &'static str,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Value,
    pub finish_reason: Option<&'static str>,
}

/// Non-streaming response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletion {
    pub id: MessageId,
    pub object: &'static str,
    pub choices: Vec<CompletionChoice>,
    pub thread_id: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: Value,
    pub finish_reason: &'static str,
}

impl ChatCompletion {
    pub fn new(content: impl Into<String>, thread_id: ThreadId) -> Self {
        Self {
            id: MessageId::chat_completion(),
            object: "chat.completion",
            choices: vec![CompletionChoice {
                index: 0,
                message: json!({"role": "assistant", "content": content.into()}),
                finish_reason: "stop",
            }],
            thread_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletionTranslator {
    id: MessageId,
}

impl Default for ChatCompletionTranslator {
    fn default() -> Self {
        Self::new(MessageId::chat_completion())
    }
}

impl ChatCompletionTranslator {
    pub fn new(id: MessageId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn role_chunk(&self) -> ChatCompletionChunk {
        self.chunk(json!({"role": "assistant"}), None)
    }

    pub fn push(&self, event: &AgentEvent) -> Option<ChatCompletionChunk> {
        match event {
            AgentEvent::Token { text } => Some(self.chunk(json!({"content": text}), None)),
            _ => None,
        }
    }

    pub fn stop_chunk(&self) -> ChatCompletionChunk {
        self.chunk(json!({}), Some("stop"))
    }

    pub fn error_chunk(message: &str) -> WireFrame {
        WireFrame::json(&json!({"error": {"message": message, "type": "server_error"}}))
    }

    /// The complete sequence for a request that never reaches the agent.
    pub fn empty(self) -> WireStream {
        let chunks = vec![Ok(self.role_chunk()), Ok(self.stop_chunk())];
        Self::encode(futures_util::stream::iter(chunks).boxed())
    }

    /// Translate the run produced by `start`. The role chunk goes out before
    /// `start` is awaited; a start failure is reported in-band.
    pub fn translate<F>(self, start: F) -> WireStream
    where
        F: Future<Output = GatewayResult<AgentEventStream>> + Send + 'static,
    {
        let chunks = stream! {
            yield Ok(self.role_chunk());
            let mut events = match start.await {
                Ok(events) => events,
                Err(error) => {
                    warn!(%error, "chat completion run failed to start");
                    yield Err(error);
                    return;
                }
            };
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => {
                        if let Some(chunk) = self.push(&event) {
                            yield Ok(chunk);
                        }
                    }
                    Err(error) => {
                        warn!(%error, "chat completion run failed");
                        yield Err(error);
                        return;
                    }
                }
            }
            yield Ok(self.stop_chunk());
        };
        Self::encode(chunks.boxed())
    }

    fn encode(chunks: BoxStream<'static, GatewayResult<ChatCompletionChunk>>) -> WireStream {
        encode_frames(
            chunks,
            |error| vec![Self::error_chunk(&error.to_string()), WireFrame::done()],
            vec![WireFrame::done()],
        )
    }

    fn chunk(&self, delta: Value, finish_reason: Option<&'static str>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk",
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}
