//! SSE wire frames.
//!
//! Every translated stream is encoded through [`encode_frames`]: a frame that
//! cannot be serialized becomes a [`GatewayError::Translation`] and is
//! reported in-band like any other run failure.

use agentgate_protocol::{AgentEventStream, GatewayError, GatewayResult};
use async_stream::stream;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

pub const DONE_SENTINEL: &str = "[DONE]";

/// The payload of one `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame(String);

pub type WireStream = BoxStream<'static, WireFrame>;

impl WireFrame {
    pub fn try_json<T: Serialize>(value: &T) -> GatewayResult<Self> {
        serde_json::to_string(value).map(Self).map_err(|error| {
            warn!(%error, "wire frame serialization failed");
            GatewayError::translation(format!("cannot encode frame: {error}"))
        })
    }

    /// Encode `value`, falling back to an `error` frame.
    pub fn json<T: Serialize>(value: &T) -> Self {
        Self::try_json(value).unwrap_or_else(|error| Self::error(&error))
    }

    pub fn done() -> Self {
        Self(DONE_SENTINEL.to_owned())
    }

    /// `{"type":"error","error":...}`.
    pub fn error(error: &GatewayError) -> Self {
        Self(json!({"type": "error", "error": error.to_string()}).to_string())
    }

    pub fn data(&self) -> &str {
        &self.0
    }

    pub fn into_data(self) -> String {
        self.0
    }

    /// `data: <payload>\n\n`.
    pub fn encode(&self) -> String {
        format!("data: {}\n\n", self.0)
    }
}

/// Encode `items` one frame each, then `trailer`. The first failure, from the
/// run or from encoding, is replaced by `on_error` and ends the stream.
pub fn encode_frames<T, E>(
    mut items: BoxStream<'static, GatewayResult<T>>,
    on_error: E,
    trailer: Vec<WireFrame>,
) -> WireStream
where
    T: Serialize + Send + 'static,
    E: Fn(&GatewayError) -> Vec<WireFrame> + Send + 'static,
{
    stream! {
        while let Some(item) = items.next().await {
            match item.and_then(|item| WireFrame::try_json(&item)) {
                Ok(frame) => yield frame,
                Err(error) => {
                    for frame in on_error(&error) {
                        yield frame;
                    }
                    return;
                }
            }
        }
        for frame in trailer {
            yield frame;
        }
    }
    .boxed()
}

/// Frame internal events as-is for `/agent/stream`, then `done`, or a single
/// `error` frame if the run fails.
pub fn agent_event_frames(events: AgentEventStream) -> WireStream {
    encode_frames(
        events,
        |error| vec![WireFrame::error(error)],
        vec![WireFrame::json(&json!({"type": "done"}))],
    )
}
