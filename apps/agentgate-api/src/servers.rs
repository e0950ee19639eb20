use crate::error::{ApiError, ApiJson, ApiResult};
use crate::AppState;
use agentgate_protocol::{DEFAULT_RPC_PATH, ServerConfig, Transport};
use agentgate_tools::ConnectivityReport;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const TEST_SERVER_NAME: &str = "connectivity-test";

/// An unregistered config to probe.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerTestRequest {
    base_url: String,
    #[serde(default)]
    transport: Transport,
    #[serde(default = "default_rpc_path", alias = "mcp_path")]
    rpc_path: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: f64,
    #[serde(default)]
    auth_token: Option<String>,
}

fn default_rpc_path() -> String {
    DEFAULT_RPC_PATH.to_owned()
}

fn default_timeout_seconds() -> f64 {
    15.0
}

impl ServerTestRequest {
    fn into_config(self) -> ApiResult<ServerConfig> {
        let timeout = Duration::try_from_secs_f64(self.timeout_seconds)
            .map_err(|_| ApiError::bad_request("timeout_seconds must be > 0"))?;
        let mut config = ServerConfig::new(TEST_SERVER_NAME, self.base_url, self.transport)
            .with_timeout(timeout);
        config.rpc_path = self.rpc_path;
        config.auth_token = self.auth_token.filter(|token| !token.is_empty());
        config.validate()?;
        Ok(config)
    }
}

pub(crate) async fn list(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "servers": state.gateway.registry().list() }))
}

pub(crate) async fn register(
    State(state): State<AppState>,
    ApiJson(config): ApiJson<ServerConfig>,
) -> ApiResult<Json<Value>> {
    state.gateway.registry().register(config)?;
    Ok(mutation_response(&state))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ApiJson(config): ApiJson<ServerConfig>,
) -> ApiResult<Json<Value>> {
    state.gateway.registry().replace(&name, config)?;
    Ok(mutation_response(&state))
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.gateway.registry().remove(&name) {
        return Err(ApiError::not_found(format!("server '{name}' not found")));
    }
    Ok(mutation_response(&state))
}

pub(crate) async fn test(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ServerTestRequest>,
) -> ApiResult<Json<ConnectivityReport>> {
    let config = request.into_config()?;
    Ok(Json(state.gateway.test_server(&config).await))
}

fn mutation_response(state: &AppState) -> Json<Value> {
    Json(json!({ "ok": true, "servers": state.gateway.registry().list() }))
}
