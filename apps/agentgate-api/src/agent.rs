use crate::error::{ApiError, ApiJson, ApiResult};
use crate::{AppState, sse_response};
use agentgate_events::agent_event_frames;
use agentgate_protocol::{Message, ThreadId};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

const DEFAULT_THREAD: &str = "default";

#[derive(Debug, Deserialize)]
pub(crate) struct AgentRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    thread_id: Option<String>,
}

impl AgentRequest {
    fn into_parts(self) -> ApiResult<(Vec<Message>, ThreadId)> {
        if self.message.trim().is_empty() {
            return Err(ApiError::bad_request("message must not be empty"));
        }
        let thread_id = self
            .thread_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD.to_owned());
        Ok((vec![Message::user(self.message)], ThreadId::from_string(thread_id)))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessageCountQuery {
    #[serde(default)]
    thread_id: String,
}

#[instrument(skip_all)]
pub(crate) async fn invoke(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AgentRequest>,
) -> ApiResult<Json<Value>> {
    let (history, thread_id) = request.into_parts()?;
    let outcome = state.gateway.invoke(history, thread_id.clone()).await?;
    Ok(Json(json!({
        "response": outcome.response,
        "thread_id": thread_id,
        "messages": outcome.messages,
    })))
}

/// Configuration failures surface as an HTTP error before any frame is sent.
#[instrument(skip_all)]
pub(crate) async fn stream(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AgentRequest>,
) -> ApiResult<Response> {
    let (history, thread_id) = request.into_parts()?;
    let events = state.gateway.run(history, thread_id).await?;
    Ok(sse_response(agent_event_frames(events)))
}

pub(crate) async fn message_count(
    State(state): State<AppState>,
    Query(query): Query<MessageCountQuery>,
) -> ApiResult<Json<Value>> {
    let thread_id = query.thread_id.trim();
    if thread_id.is_empty() {
        return Err(ApiError::bad_request("thread_id is required"));
    }
    let thread_id = ThreadId::from_string(thread_id);
    let counts = state.gateway.message_counts(&thread_id);
    Ok(Json(json!({
        "thread_id": thread_id,
        "raw_message_count": counts.raw_message_count,
        "sanitized_message_count": counts.sanitized_message_count,
    })))
}
