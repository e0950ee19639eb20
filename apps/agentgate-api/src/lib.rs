//! # agentgate-api: HTTP surface
//!
//! - [`config`]: settings from flags and environment, CORS
//! - [`error`]: `ApiError` and the JSON extractor
//! - `servers`: registry CRUD and connectivity checks
//! - `discovery`: network info and subnet scans
//! - `agent`: `/agent/*` invoke, stream and message counts
//! - `copilotkit`: the dual AG-UI / chat-completions endpoint

pub mod config;
pub mod error;

mod agent;
mod copilotkit;
mod discovery;
mod servers;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use agentgate_events::WireFrame;
use agentgate_kernel::Gateway;
use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use config::{CorsSettings, Settings, parse_cors_origins, parse_servers_json};
pub use copilotkit::runtime_info;
pub use error::{ApiError, ApiJson, ApiResult};

#[derive(Clone)]
pub struct AppState {
    gateway: Gateway,
    status: Arc<StatusInfo>,
}

#[derive(Debug)]
struct StatusInfo {
    cors: CorsSettings,
    warnings: Vec<String>,
}

impl AppState {
    pub fn new(gateway: Gateway, cors: CorsSettings, warnings: Vec<String>) -> Self {
        Self {
            gateway,
            status: Arc::new(StatusInfo { cors, warnings }),
        }
    }

    /// Build the gateway and state from settings in one step.
    pub fn from_settings(settings: &Settings) -> Self {
        let (builder, warnings) = settings.builder();
        Self::new(builder.build(), settings.cors(), warnings)
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

pub fn router(state: AppState) -> Router {
    let cors = state.status.cors.layer();
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/servers", get(servers::list).post(servers::register))
        .route("/servers/test", post(servers::test))
        .route("/servers/{name}", put(servers::update).delete(servers::remove))
        .route("/discovery/network", get(discovery::network))
        .route("/discovery/scan", post(discovery::scan))
        .route("/agent/invoke", post(agent::invoke))
        .route("/agent/stream", post(agent::stream))
        .route("/agent/message-count", get(agent::message_count))
        .route("/copilotkit", post(copilotkit::endpoint))
        .route("/copilotkit/info", get(copilotkit::info))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let gateway = &state.gateway;
    let info = &state.status;
    Json(json!({
        "status": "ok",
        "openai_configured": gateway.openai().is_configured(),
        "openai_model": gateway.openai().model,
        "fake_mode": gateway.fake_mode(),
        "cors_allow_origins": info.cors.allow_origins,
        "cors_allow_credentials": info.cors.credentials_enabled(),
        "server_count": gateway.registry().len(),
        "warnings": info.warnings,
    }))
}

/// Wrap wire frames as an SSE response. Dropping the body stops the frames.
fn sse_response<S>(frames: S) -> Response
where
    S: Stream<Item = WireFrame> + Send + 'static,
{
    let events = frames.map(|frame| Ok::<_, Infallible>(Event::default().data(frame.into_data())));
    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    );
    ([(CACHE_CONTROL, HeaderValue::from_static("no-cache"))], sse).into_response()
}
