//! # agentgate-protocol: shared gateway contract
//!
//! Types every agentgate crate agrees on. Kept free of runtime
//! dependencies (no tokio, axum or reqwest) so it stays a pure contract crate.
//!
//! ## Module Overview
//!
//! - [`ids`]: Typed ID wrappers (ThreadId, RunId, MessageId, ToolCallId)
//! - [`event`]: `AgentEvent`, the internal event taxonomy fed to translators
//! - [`message`]: Conversation `Message`s and tolerant history parsing
//! - [`server`]: `ServerConfig`, `Transport`
//! - [`tool`]: Tool definitions, call context and the result envelope
//! - [`ports`]: The `AgentTool` boundary trait and `ToolSet`
//! - [`error`]: `GatewayError`, `UpstreamError`, `GatewayResult`

pub mod error;
pub mod event;
pub mod ids;
pub mod message;
pub mod ports;
pub mod server;
pub mod tool;

pub use error::{GatewayError, GatewayResult, UpstreamError};
pub use event::{AgentEvent, AgentEventStream, compact};
pub use ids::{MessageId, RunId, ThreadId, ToolCallId};
pub use message::{Message, MessageToolCall, Role, latest_user_text, parse_history};
pub use ports::{AgentTool, ToolSet};
pub use server::{DEFAULT_RPC_PATH, ServerConfig, Transport, join_url};
pub use tool::{ToolContext, ToolDefinition, ToolEnvelope};
