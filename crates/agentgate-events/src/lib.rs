//! # agentgate-events: protocol translators
//!
//! Both translators fold one `AgentEvent` stream into a wire protocol:
//!
//! - [`openai`]: OpenAI chat-completion chunks
//! - [`agui`]: AG-UI run lifecycle events
//! - [`correlation`]: tool-call id resolution used by the AG-UI translator
//! - [`sse`]: `data:` frames and the `/agent/stream` framing

pub mod agui;
pub mod correlation;
pub mod openai;
pub mod sse;

pub use agui::{AguiEvent, AguiTranslator, connect_events, connect_frames, normalize_run_input};
pub use correlation::{StartResolution, ToolCallCorrelator};
pub use openai::{ChatCompletion, ChatCompletionChunk, ChatCompletionTranslator};
pub use sse::{DONE_SENTINEL, WireFrame, WireStream, agent_event_frames, encode_frames};
