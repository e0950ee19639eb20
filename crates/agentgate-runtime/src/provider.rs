//! The agent runtime port.
//!
//! A runtime takes a conversation plus a tool set and alternates model
//! inference with tool execution until the model answers without calling
//! tools. It reports progress as raw [`RuntimeEvent`]s, which
//! [`crate::normalize::EventNormalizer`] turns into `AgentEvent`s.

use agentgate_protocol::{GatewayResult, Message, ThreadId, ToolSet};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct RuntimeRequest {
    pub thread_id: ThreadId,
    pub messages: Vec<Message>,
    pub tools: ToolSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    /// One streamed fragment of model output. `content` is a string or a list
    /// of typed blocks; `metadata` carries out-of-band delta fields such as
    /// `reasoning_content`.
    ModelChunk {
        content: Value,
        metadata: Map<String, Value>,
    },
    ToolStarted {
        name: String,
        input: Value,
        call_id: Option<String>,
    },
    ToolFinished {
        name: String,
        output: Value,
        call_id: Option<String>,
    },
    /// A message the run added to the conversation.
    MessageAppended(Message),
}

pub type RuntimeEventStream = BoxStream<'static, GatewayResult<RuntimeEvent>>;

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Start a run. Configuration problems (missing credentials) are
    /// returned here, before any event is produced.
    async fn start(&self, request: RuntimeRequest) -> GatewayResult<RuntimeEventStream>;
}
