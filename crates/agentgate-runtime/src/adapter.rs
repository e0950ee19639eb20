//! The agent adapter: one entry point that turns a conversation into a
//! stream of normalized `AgentEvent`s, backed either by a real runtime or by
//! the fake-mode trace.

use crate::fake::{fake_response_text, fake_trace};
use crate::normalize::EventNormalizer;
use crate::provider::{AgentRuntime, RuntimeEvent, RuntimeRequest};
use crate::sanitize::OutputSanitizerConfig;
use agentgate_protocol::{
    AgentEventStream, GatewayResult, Message, Role, ThreadId, ToolSet, latest_user_text,
};
use async_stream::try_stream;
use futures_util::{StreamExt, stream};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

pub const SYSTEM_PROMPT: &str = "You are a device operations copilot. \
Use the available server tools to inspect devices and perform actions. \
For discovery tasks, use the local network discovery tools first, then confirm findings. \
When tools fail, explain the failure clearly and suggest the next check.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeOutcome {
    pub response: String,
    pub messages: Vec<Message>,
}

#[derive(Clone)]
pub struct AgentService {
    runtime: Arc<dyn AgentRuntime>,
    tools: ToolSet,
    fake_mode: bool,
    output: OutputSanitizerConfig,
}

impl AgentService {
    pub fn new(runtime: Arc<dyn AgentRuntime>, tools: ToolSet) -> Self {
        Self {
            runtime,
            tools,
            fake_mode: false,
            output: OutputSanitizerConfig::default(),
        }
    }

    pub fn with_fake_mode(mut self, fake_mode: bool) -> Self {
        self.fake_mode = fake_mode;
        self
    }

    /// Filter applied to the history returned by [`invoke`](Self::invoke).
    pub fn with_output_sanitizer(mut self, output: OutputSanitizerConfig) -> Self {
        self.output = output;
        self
    }

    pub fn fake_mode(&self) -> bool {
        self.fake_mode
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Run the agent over `history` and stream its normalized events.
    ///
    /// Runtime configuration failures are returned before the stream starts;
    /// failures during the run arrive as the stream's last item.
    #[instrument(skip(self, history), fields(thread_id = %thread_id, messages = history.len(), fake = self.fake_mode))]
    pub async fn run(
        &self,
        history: Vec<Message>,
        thread_id: ThreadId,
    ) -> GatewayResult<AgentEventStream> {
        if self.fake_mode {
            let message = latest_user_text(&history).unwrap_or_default();
            let events = fake_trace(message, &thread_id);
            return Ok(stream::iter(events.into_iter().map(Ok)).boxed());
        }

        let mut raw = self.runtime.start(self.request(history, thread_id)).await?;
        let events = try_stream! {
            let mut normalizer = EventNormalizer::new();
            while let Some(event) = raw.next().await {
                for normalized in normalizer.push(event?) {
                    yield normalized;
                }
            }
            if let Some(end) = normalizer.finish() {
                yield end;
            }
        };
        Ok(events.boxed())
    }

    /// Run to completion and return the final answer plus the full resulting
    /// history: system prompt, caller history, then every appended message.
    /// The output sanitizer, when enabled, filters that history.
    #[instrument(skip(self, history), fields(thread_id = %thread_id, fake = self.fake_mode))]
    pub async fn invoke(
        &self,
        history: Vec<Message>,
        thread_id: ThreadId,
    ) -> GatewayResult<InvokeOutcome> {
        if self.fake_mode {
            let message = latest_user_text(&history).unwrap_or_default();
            return Ok(InvokeOutcome {
                response: fake_response_text(message),
                messages: Vec::new(),
            });
        }

        let request = self.request(history, thread_id);
        let mut messages = request.messages.clone();
        let prompt_len = messages.len();
        let mut raw = self.runtime.start(request).await?;
        while let Some(event) = raw.next().await {
            if let RuntimeEvent::MessageAppended(message) = event? {
                messages.push(message);
            }
        }
        let response = messages[prompt_len..]
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.clone())
            .unwrap_or_default();
        info!(
            appended = messages.len() - prompt_len,
            "agent invoke finished"
        );
        Ok(InvokeOutcome {
            response,
            messages: self.output.apply(messages),
        })
    }

    fn request(&self, history: Vec<Message>, thread_id: ThreadId) -> RuntimeRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(SYSTEM_PROMPT));
        messages.extend(history);
        RuntimeRequest {
            thread_id,
            messages,
            tools: self.tools.clone(),
        }
    }
}
