//! HTTP surface tests. Everything runs in fake mode or without a model key,
//! so no network access is needed.

use agentgate_api::{AppState, Settings, router};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app_with(settings: Settings) -> Router {
    router(AppState::from_settings(&settings))
}

fn fake_app() -> Router {
    app_with(Settings {
        fake_mode: true,
        ..Settings::default()
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = send(app, method, uri, body).await;
    (status, serde_json::from_str(&text).unwrap())
}

/// Payloads of every `data:` line, in order.
fn sse_data(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(str::to_owned)
        .collect()
}

fn sse_json(body: &str) -> Vec<Value> {
    sse_data(body)
        .iter()
        .filter(|data| data.as_str() != "[DONE]")
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send_json(&fake_app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn status_reports_configuration_and_startup_warnings() {
    let app = app_with(Settings {
        fake_mode: true,
        servers_json: r#"[{"name":"plants","base_url":"http://10.0.0.5"},{"name":""}]"#.into(),
        cors_allow_origins: "http://ui.test".into(),
        cors_allow_credentials: true,
        ..Settings::default()
    });
    let (status, body) = send_json(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["openai_configured"], json!(false));
    assert_eq!(body["openai_model"], json!("gpt-4.1-mini"));
    assert_eq!(body["fake_mode"], json!(true));
    assert_eq!(body["server_count"], json!(1));
    assert_eq!(body["cors_allow_origins"], json!(["http://ui.test"]));
    assert_eq!(body["cors_allow_credentials"], json!(true));
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("AGENTGATE_SERVERS_JSON[1]"));
}

#[tokio::test]
async fn server_registry_crud() {
    let app = fake_app();

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/servers",
        Some(json!({"name": "plants", "base_url": "http://10.0.0.5", "transport": "esp32_rest"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["servers"][0]["transport"], json!("device_rest"));

    let (_, body) = send_json(&app, Method::GET, "/servers", None).await;
    assert_eq!(body["servers"].as_array().unwrap().len(), 1);
    assert!(body.get("ok").is_none());

    let (status, body) = send_json(
        &app,
        Method::PUT,
        "/servers/plants",
        Some(json!({"name": "greenhouse", "base_url": "http://10.0.0.6"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["servers"][0]["name"], json!("greenhouse"));
    assert_eq!(body["servers"].as_array().unwrap().len(), 1);

    let (status, body) = send_json(
        &app,
        Method::PUT,
        "/servers/missing",
        Some(json!({"name": "missing", "base_url": "http://10.0.0.7"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = send_json(&app, Method::DELETE, "/servers/greenhouse", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["servers"], json!([]));

    let (status, body) = send_json(&app, Method::DELETE, "/servers/greenhouse", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("server 'greenhouse' not found"));
}

#[tokio::test]
async fn invalid_server_configs_are_rejected() {
    let app = fake_app();
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/servers",
        Some(json!({"name": " ", "base_url": "http://10.0.0.5"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/servers/test",
        Some(json!({"base_url": "http://10.0.0.5", "timeout_seconds": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_json_gets_a_json_error() {
    let app = fake_app();
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/agent/invoke")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invoke_in_fake_mode_echoes_the_message() {
    let (status, body) = send_json(
        &fake_app(),
        Method::POST,
        "/agent/invoke",
        Some(json!({"message": "ping"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].as_str().unwrap().contains("You said: `ping`"));
    assert_eq!(body["thread_id"], json!("default"));
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn empty_message_is_a_bad_request() {
    for uri in ["/agent/invoke", "/agent/stream"] {
        let (status, body) =
            send_json(&fake_app(), Method::POST, uri, Some(json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], json!("message must not be empty"));
    }
}

#[tokio::test]
async fn agent_stream_frames_internal_events_and_ends_with_done() {
    let (status, body) = send(
        &fake_app(),
        Method::POST,
        "/agent/stream",
        Some(json!({"message": "ping", "thread_id": "t-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = sse_json(&body);
    assert_eq!(events[0], json!({"type": "thinking_start", "title": "Planning"}));
    let tool_start = events.iter().find(|event| event["type"] == "tool_start").unwrap();
    assert_eq!(tool_start["tool_name"], json!("fake_tool"));
    assert_eq!(tool_start["tool_call_key"], json!("fake_tool_call_1"));
    let tool_end = events.iter().find(|event| event["type"] == "tool_end").unwrap();
    assert!(tool_end["output"].as_str().unwrap().contains("t-1"));
    assert!(events.iter().any(|event| event["type"] == "token"));
    assert_eq!(events.last().unwrap(), &json!({"type": "done"}));
}

#[tokio::test]
async fn agent_stream_without_a_model_key_fails_before_streaming() {
    let (status, body) = send_json(
        &app_with(Settings::default()),
        Method::POST,
        "/agent/stream",
        Some(json!({"message": "ping"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn message_count_requires_a_thread_and_defaults_to_zero() {
    let app = fake_app();
    let (status, _) = send_json(&app, Method::GET, "/agent/message-count", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        send_json(&app, Method::GET, "/agent/message-count?thread_id=unknown", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"thread_id": "unknown", "raw_message_count": 0, "sanitized_message_count": 0})
    );
}

#[tokio::test]
async fn discovery_rejects_non_ipv4_subnets() {
    let (status, body) = send_json(
        &fake_app(),
        Method::GET,
        "/discovery/network?subnet_cidr=fe80::/64",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send_json(
        &fake_app(),
        Method::POST,
        "/discovery/scan",
        Some(json!({"subnet_cidr": "10.0.0.0/30", "ports_csv": "http"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn copilotkit_info_both_ways() {
    let app = fake_app();
    let (status, by_get) = send_json(&app, Method::GET, "/copilotkit/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_get["agents"]["default"]["name"], json!("default"));

    let (status, by_method) =
        send_json(&app, Method::POST, "/copilotkit", Some(json!({"method": "info"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_method, by_get);

    let (_, stop) =
        send_json(&app, Method::POST, "/copilotkit", Some(json!({"method": "agent/stop"}))).await;
    assert_eq!(stop, json!({"ok": true}));
}

#[tokio::test]
async fn copilotkit_rejects_unknown_methods() {
    let (status, body) = send_json(
        &fake_app(),
        Method::POST,
        "/copilotkit",
        Some(json!({"method": "agent/dance"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Unsupported method: agent/dance"));
}

#[tokio::test]
async fn agui_connect_is_an_empty_run() {
    let (status, body) = send(
        &fake_app(),
        Method::POST,
        "/copilotkit",
        Some(json!({"method": "agent/connect", "params": {"threadId": "th-9"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = sse_json(&body);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], json!("RUN_STARTED"));
    assert_eq!(events[0]["threadId"], json!("th-9"));
    assert_eq!(events[0]["input"]["messages"], json!([]));
    assert_eq!(events[1]["type"], json!("RUN_FINISHED"));
    assert_eq!(events[1]["runId"], events[0]["runId"]);
}

#[tokio::test]
async fn agui_run_in_fake_mode_follows_the_lifecycle() {
    let (status, body) = send(
        &fake_app(),
        Method::POST,
        "/copilotkit",
        Some(json!({
            "method": "agent/run",
            "params": {"threadId": "ignored"},
            "body": {
                "threadId": "th-1",
                "runId": "run-1",
                "messages": [{"id": "m1", "role": "user", "content": "water the plants"}],
                "state": "not an object",
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = sse_json(&body);
    let types: Vec<&str> = events
        .iter()
        .map(|event| event["type"].as_str().unwrap())
        .collect();

    assert_eq!(types[0], "RUN_STARTED");
    assert_eq!(events[0]["threadId"], json!("th-1"));
    assert_eq!(events[0]["runId"], json!("run-1"));
    assert_eq!(events[0]["input"]["state"], json!({}));
    assert_eq!(types[1], "TEXT_MESSAGE_START");
    assert_eq!(*types.last().unwrap(), "RUN_FINISHED");
    assert_eq!(types[types.len() - 2], "TEXT_MESSAGE_END");
    assert!(!types.contains(&"RUN_ERROR"));

    let start = events
        .iter()
        .find(|event| event["type"] == "TOOL_CALL_START")
        .unwrap();
    assert_eq!(start["toolCallName"], json!("fake_tool"));
    let result = events
        .iter()
        .find(|event| event["type"] == "TOOL_CALL_RESULT")
        .unwrap();
    assert_eq!(result["toolCallId"], start["toolCallId"]);
    assert!(result["content"].as_str().unwrap().starts_with("[fake_tool] "));

    let text: String = events
        .iter()
        .filter(|event| event["type"] == "TEXT_MESSAGE_CONTENT")
        .map(|event| event["delta"].as_str().unwrap())
        .collect();
    assert!(text.contains("water the plants"));
}

#[tokio::test]
async fn agui_run_without_a_model_key_ends_in_run_error() {
    let (status, body) = send(
        &app_with(Settings::default()),
        Method::POST,
        "/copilotkit",
        Some(json!({
            "method": "agent/run",
            "body": {"messages": [{"role": "user", "content": "hi"}]},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = sse_json(&body);
    assert_eq!(events[0]["type"], json!("RUN_STARTED"));
    let last = events.last().unwrap();
    assert_eq!(last["type"], json!("RUN_ERROR"));
    assert_eq!(last["code"], json!("server_error"));
    assert!(!events.iter().any(|event| event["type"] == "RUN_FINISHED"));
}

#[tokio::test]
async fn chat_completion_stream_ends_with_done() {
    let (status, body) = send(
        &fake_app(),
        Method::POST,
        "/copilotkit",
        Some(json!({"messages": [{"role": "user", "content": "ping"}], "stream": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = sse_data(&body);
    assert_eq!(data.last().unwrap(), "[DONE]");
    let chunks = sse_json(&body);
    assert_eq!(chunks[0]["choices"][0]["delta"], json!({"role": "assistant"}));
    assert_eq!(
        chunks.last().unwrap()["choices"][0]["finish_reason"],
        json!("stop")
    );
    let text: String = chunks
        .iter()
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str())
        .collect();
    assert!(text.contains("You said: `ping`"));
    assert!(chunks.iter().all(|chunk| chunk["object"] == "chat.completion.chunk"));
}

#[tokio::test]
async fn chat_completion_without_user_message_skips_the_agent() {
    let app = fake_app();
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/copilotkit",
        Some(json!({"messages": [{"role": "system", "content": "be brief"}], "thread_id": "t-7"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], json!("chat.completion"));
    assert_eq!(body["choices"][0]["message"]["content"], json!(""));
    assert_eq!(body["thread_id"], json!("t-7"));

    let (_, stream) = send(
        &app,
        Method::POST,
        "/copilotkit",
        Some(json!({"messages": [], "stream": true})),
    )
    .await;
    assert_eq!(sse_data(&stream).len(), 3);
}

#[tokio::test]
async fn chat_completion_non_streaming_in_fake_mode() {
    let (status, body) = send_json(
        &fake_app(),
        Method::POST,
        "/copilotkit",
        Some(json!({"messages": [{"role": "user", "content": "status?"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert!(
        body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap()
            .contains("status?")
    );
    assert!(body["thread_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn null_method_is_a_chat_completion_request() {
    let (status, body) = send_json(
        &fake_app(),
        Method::POST,
        "/copilotkit",
        Some(json!({"method": null, "messages": [{"role": "user", "content": "ping"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["object"], json!("chat.completion"));
    assert!(
        body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap()
            .contains("ping")
    );
}
