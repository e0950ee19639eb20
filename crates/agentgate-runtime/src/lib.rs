//! # agentgate-runtime: agent runtime adapter
//!
//! - [`provider`]: the `AgentRuntime` port and its raw event type
//! - [`openai`]: OpenAI-compatible streaming ReAct runtime
//! - [`stream`]: incremental SSE body decoder
//! - [`normalize`]: raw runtime output to `AgentEvent`s
//! - [`sanitize`]: history bounding before each model turn, post-run filtering
//! - [`counts`]: per-thread message counts and the `agent_message_count` tool
//! - [`fake`]: deterministic fake-mode trace
//! - [`adapter`]: `AgentService`, the single entry point used by the surfaces

pub mod adapter;
pub mod counts;
pub mod fake;
pub mod normalize;
pub mod openai;
pub mod provider;
pub mod sanitize;
pub mod stream;

pub use adapter::{AgentService, InvokeOutcome, SYSTEM_PROMPT};
pub use counts::{AgentMessageCountTool, MessageCounts, ThreadMessageCounts};
pub use fake::{fake_response_text, fake_trace};
pub use normalize::EventNormalizer;
pub use openai::{MAX_TURNS, OpenAiConfig, OpenAiRuntime};
pub use provider::{AgentRuntime, RuntimeEvent, RuntimeEventStream, RuntimeRequest};
pub use sanitize::{HistoryStrategy, InputSanitizer, OutputSanitizerConfig, SanitizerConfig};
pub use stream::SseDecoder;
