//! `/copilotkit`: one endpoint, two protocols.
//!
//! A body with a non-null `method` field is an AG-UI envelope; anything else
//! is an OpenAI chat-completions request.

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::{AppState, sse_response};
use agentgate_events::{
    AguiTranslator, ChatCompletion, ChatCompletionTranslator, connect_frames, normalize_run_input,
};
use agentgate_protocol::{RunId, ThreadId, latest_user_text, parse_history};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
struct Envelope {
    method: String,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    body: Value,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    stream: bool,
}

pub fn runtime_info() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "audioFileTranscriptionEnabled": false,
        "agents": {
            "default": {
                "name": "default",
                "className": "AgentGateDeviceAgent",
                "description": "Device operations assistant over registered tool servers",
            }
        },
    })
}

pub(crate) async fn info() -> Json<Value> {
    Json(runtime_info())
}

pub(crate) async fn endpoint(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> ApiResult<Response> {
    if payload.get("method").is_some_and(|method| !method.is_null()) {
        let envelope: Envelope = serde_json::from_value(payload)
            .map_err(|error| ApiError::bad_request(format!("invalid AG-UI envelope: {error}")))?;
        return agui(state, envelope);
    }
    let request: ChatRequest = serde_json::from_value(payload)
        .map_err(|error| ApiError::bad_request(format!("invalid chat request: {error}")))?;
    chat(state, request).await
}

#[instrument(skip_all, fields(method = %envelope.method))]
fn agui(state: AppState, envelope: Envelope) -> ApiResult<Response> {
    match envelope.method.as_str() {
        "info" => Ok(Json(runtime_info()).into_response()),
        "agent/stop" => Ok(Json(json!({ "ok": true })).into_response()),
        "agent/connect" => {
            let thread_id = string_field(&envelope.params, "threadId")
                .map(ThreadId::from_string)
                .unwrap_or_else(ThreadId::new_uuid);
            Ok(sse_response(connect_frames(thread_id, RunId::new_uuid())))
        }
        "agent/run" => {
            let body = match envelope.body {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            let thread_id = string_field(&body, "threadId")
                .or_else(|| string_field(&envelope.params, "threadId"))
                .map(ThreadId::from_string)
                .unwrap_or_else(ThreadId::new_uuid);
            let run_id = string_field(&body, "runId")
                .map(RunId::from_string)
                .unwrap_or_else(RunId::new_uuid);
            let history = match body.get("messages") {
                Some(Value::Array(messages)) => parse_history(messages),
                _ => Vec::new(),
            };
            let body = Value::Object(body);
            let input = normalize_run_input(&body, &thread_id, &run_id);
            info!(thread_id = %thread_id, run_id = %run_id, messages = history.len(), "ag-ui run");

            let gateway = state.gateway.clone();
            let run_thread = thread_id.clone();
            let frames = AguiTranslator::new(thread_id, run_id)
                .frames(input, async move { gateway.run(history, run_thread).await });
            Ok(sse_response(frames))
        }
        other => Err(ApiError::bad_request(format!("Unsupported method: {other}"))),
    }
}

#[instrument(skip_all, fields(stream = request.stream))]
async fn chat(state: AppState, request: ChatRequest) -> ApiResult<Response> {
    let history = parse_history(&request.messages);
    let thread_id = request
        .thread_id
        .filter(|id| !id.is_empty())
        .map(ThreadId::from_string)
        .unwrap_or_else(ThreadId::new_uuid);

    if latest_user_text(&history).is_none() {
        if request.stream {
            return Ok(sse_response(ChatCompletionTranslator::default().empty()));
        }
        return Ok(Json(ChatCompletion::new("", thread_id)).into_response());
    }

    if request.stream {
        let gateway = state.gateway.clone();
        let frames = ChatCompletionTranslator::default()
            .translate(async move { gateway.run(history, thread_id).await });
        return Ok(sse_response(frames));
    }

    let outcome = state.gateway.invoke(history, thread_id.clone()).await?;
    Ok(Json(ChatCompletion::new(outcome.response, thread_id)).into_response())
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
