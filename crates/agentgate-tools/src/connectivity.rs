//! Reachability check for a server config that is not registered yet.

use crate::client::RemoteToolClient;
use crate::jsonrpc::JsonRpcRequest;
use agentgate_protocol::{ServerConfig, Transport, UpstreamError};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityReport {
    pub ok: bool,
    pub transport: Transport,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectivityReport {
    fn passed(config: &ServerConfig, endpoint: String, details: Value) -> Self {
        Self {
            ok: true,
            transport: config.transport,
            endpoint,
            details: Some(details),
            error: None,
        }
    }

    fn failed(config: &ServerConfig, endpoint: String, error: String) -> Self {
        Self {
            ok: false,
            transport: config.transport,
            endpoint,
            details: None,
            error: Some(error),
        }
    }
}

impl RemoteToolClient {
    /// Probe `config` once. Failures are reported in the result, never raised.
    #[instrument(skip(self, config), fields(transport = %config.transport, base_url = %config.base_url))]
    pub async fn check_connectivity(&self, config: &ServerConfig) -> ConnectivityReport {
        match config.transport {
            Transport::JsonRpc => {
                let endpoint = config.rpc_endpoint();
                let request = JsonRpcRequest::with_id("connectivity-check", "tools/list", json!({}));
                match self.rpc_exchange(config, &request).await {
                    Ok(response) => match response.remote_error() {
                        Some(error) => ConnectivityReport::failed(
                            config,
                            endpoint,
                            format!("server responded with error: {error}"),
                        ),
                        None => ConnectivityReport::passed(
                            config,
                            endpoint,
                            json!({ "tools_count": response.tools_count() }),
                        ),
                    },
                    Err(error) => ConnectivityReport::failed(config, endpoint, describe(&error)),
                }
            }
            Transport::DeviceRest => {
                let endpoint = config.endpoint("/api");
                match self.get(config, "/api").await {
                    Ok(response) => ConnectivityReport::passed(
                        config,
                        endpoint,
                        json!({ "status_code": response.status().as_u16() }),
                    ),
                    Err(error) => ConnectivityReport::failed(config, endpoint, describe(&error)),
                }
            }
        }
    }
}

fn describe(error: &UpstreamError) -> String {
    debug!(%error, "connectivity check failed");
    match error {
        UpstreamError::Timeout { .. } => format!("Timeout while connecting: {error}"),
        UpstreamError::Connect { message, .. } => {
            format!("Connection failed (possible DNS/host issue): {message}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn json_rpc_reports_tool_count() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": "connectivity-check",
                "result": {"tools": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}
            })))
            .mount(&mock)
            .await;

        let config = ServerConfig::new("probe", mock.uri(), Transport::JsonRpc);
        let report = RemoteToolClient::new().check_connectivity(&config).await;
        assert!(report.ok);
        assert_eq!(report.endpoint, format!("{}/mcp", mock.uri()));
        assert_eq!(report.details, Some(json!({"tools_count": 3})));
    }

    #[tokio::test]
    async fn device_rest_reports_status_code() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&mock)
            .await;

        let config = ServerConfig::new("probe", mock.uri(), Transport::DeviceRest);
        let report = RemoteToolClient::new().check_connectivity(&config).await;
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["transport"], "device_rest");
        assert_eq!(value["details"]["status_code"], 200);
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_reported_not_raised() {
        let config = ServerConfig::new("probe", "http://127.0.0.1:9", Transport::DeviceRest)
            .with_timeout(Duration::from_millis(300));
        let report = RemoteToolClient::new().check_connectivity(&config).await;
        assert!(!report.ok);
        assert!(report.error.is_some());
    }
}
