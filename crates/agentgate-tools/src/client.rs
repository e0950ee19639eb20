//! Remote tool client.
//!
//! One entry point, [`RemoteToolClient::call`], covering both transports:
//! JSON-RPC servers get a `tools/call` envelope, device-REST servers get the
//! fixed operation mapping in [`DeviceOperation`].

use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use agentgate_protocol::{GatewayError, GatewayResult, ServerConfig, Transport, UpstreamError};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

/// Device operations with their descriptions, as advertised by
/// `list_server_tools` for device-REST servers.
pub const DEVICE_CATALOGUE: &[(&str, &str)] = &[
    (
        "api_overview",
        "GET /api summary payload for device modules and status",
    ),
    ("api_soil", "GET /api/soil soil moisture data"),
    ("api_dht", "GET /api/dht temperature and humidity data"),
    ("api_relays", "GET /api/relays relay states"),
    (
        "relay_set",
        "GET /api/relays/set with query keys: ch and state(on/off)",
    ),
    (
        "pump_control",
        "GET /watering_pumps with query keys ch(A/B/C), sec, off(1)",
    ),
    (
        "http_request",
        "Generic HTTP request. Arguments: method, path, query(optional), body(optional)",
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub enum PumpCommand {
    Off,
    Run { channel: String, seconds: i64 },
}

/// A named device-REST operation with its arguments resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceOperation {
    Overview,
    Soil,
    Dht,
    Relays,
    RelaySet { channel: String, state: String },
    Pump(PumpCommand),
    HttpRequest {
        method: Method,
        path: String,
        query: Vec<(String, String)>,
        body: Option<Value>,
    },
}

/// Method, path, query and optional JSON body of one device call.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl DeviceOperation {
    /// Resolve an operation name and its arguments. Unknown names are a
    /// validation error and never reach the network.
    pub fn parse(name: &str, arguments: &Value) -> GatewayResult<Self> {
        let operation = match name {
            "api_overview" => Self::Overview,
            "api_soil" => Self::Soil,
            "api_dht" => Self::Dht,
            "api_relays" => Self::Relays,
            "relay_set" => Self::RelaySet {
                channel: string_arg(arguments, "ch", "A"),
                state: string_arg(arguments, "state", "off"),
            },
            "pump_control" => {
                if arguments.get("off").is_some_and(is_truthy) {
                    Self::Pump(PumpCommand::Off)
                } else {
                    Self::Pump(PumpCommand::Run {
                        channel: string_arg(arguments, "ch", "A"),
                        seconds: integer_arg(arguments, "sec", 5)?,
                    })
                }
            }
            "http_request" => {
                let raw_method = string_arg(arguments, "method", "GET").to_uppercase();
                let method = Method::from_bytes(raw_method.as_bytes()).map_err(|_| {
                    GatewayError::validation(format!("invalid HTTP method '{raw_method}'"))
                })?;
                let query = arguments
                    .get("query")
                    .and_then(Value::as_object)
                    .map(query_pairs)
                    .unwrap_or_default();
                let body = arguments
                    .get("body")
                    .filter(|body| body.is_object())
                    .cloned();
                Self::HttpRequest {
                    method,
                    path: string_arg(arguments, "path", "/api"),
                    query,
                    body,
                }
            }
            other => {
                return Err(GatewayError::validation(format!(
                    "unknown device_rest tool '{other}'"
                )));
            }
        };
        Ok(operation)
    }

    pub fn request(&self) -> DeviceRequest {
        let get = |path: &str, query: Vec<(String, String)>| DeviceRequest {
            method: Method::GET,
            path: path.to_owned(),
            query,
            body: None,
        };
        match self {
            Self::Overview => get("/api", Vec::new()),
            Self::Soil => get("/api/soil", Vec::new()),
            Self::Dht => get("/api/dht", Vec::new()),
            Self::Relays => get("/api/relays", Vec::new()),
            Self::RelaySet { channel, state } => get(
                "/api/relays/set",
                vec![("ch".into(), channel.clone()), ("state".into(), state.clone())],
            ),
            Self::Pump(PumpCommand::Off) => {
                get("/watering_pumps", vec![("off".into(), "1".into())])
            }
            Self::Pump(PumpCommand::Run { channel, seconds }) => get(
                "/watering_pumps",
                vec![("ch".into(), channel.clone()), ("sec".into(), seconds.to_string())],
            ),
            Self::HttpRequest {
                method,
                path,
                query,
                body,
            } => DeviceRequest {
                method: method.clone(),
                path: path.clone(),
                query: query.clone(),
                body: body.clone(),
            },
        }
    }
}

/// The device operation catalogue in `tools/list` shape.
pub fn device_catalogue() -> Value {
    let tools: Vec<Value> = DEVICE_CATALOGUE
        .iter()
        .map(|(name, description)| json!({"name": name, "description": description}))
        .collect();
    json!({ "tools": tools })
}

#[derive(Debug, Clone, Default)]
pub struct RemoteToolClient {
    http: reqwest::Client,
}

impl RemoteToolClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Invoke `operation` on a registered server.
    #[instrument(skip(self, config, arguments), fields(server = %config.name, transport = %config.transport))]
    pub async fn call(
        &self,
        config: &ServerConfig,
        operation: &str,
        arguments: Value,
    ) -> GatewayResult<Value> {
        match config.transport {
            Transport::JsonRpc => {
                self.rpc(
                    config,
                    "tools/call",
                    json!({ "name": operation, "arguments": arguments }),
                )
                .await
            }
            Transport::DeviceRest => {
                let request = DeviceOperation::parse(operation, &arguments)?.request();
                self.device(config, &request).await
            }
        }
    }

    /// Tools a server exposes: the remote `tools/list` result, or the fixed
    /// device catalogue.
    #[instrument(skip(self, config), fields(server = %config.name, transport = %config.transport))]
    pub async fn list_tools(&self, config: &ServerConfig) -> GatewayResult<Value> {
        match config.transport {
            Transport::JsonRpc => self.rpc(config, "tools/list", json!({})).await,
            Transport::DeviceRest => Ok(device_catalogue()),
        }
    }

    /// Send one JSON-RPC request and return its `result` (or `{}`).
    pub async fn rpc(
        &self,
        config: &ServerConfig,
        method: &str,
        params: Value,
    ) -> GatewayResult<Value> {
        let request = JsonRpcRequest::new(method, params);
        let response = self.rpc_exchange(config, &request).await?;
        if let Some(error) = response.remote_error() {
            warn!(server = %config.name, %error, "remote JSON-RPC error");
            return Err(UpstreamError::Remote {
                server: config.name.clone(),
                payload: error.clone(),
            }
            .into());
        }
        Ok(response.result.unwrap_or_else(|| json!({})))
    }

    /// Post `request` to the server's RPC endpoint and decode the envelope.
    pub async fn rpc_exchange(
        &self,
        config: &ServerConfig,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, UpstreamError> {
        let endpoint = config.rpc_endpoint();
        debug!(%endpoint, method = %request.method, "sending JSON-RPC request");
        let builder = authorize(self.http.post(&endpoint), config)
            .timeout(config.timeout)
            .json(request);
        let response = send(builder, &endpoint).await?;
        response
            .json::<JsonRpcResponse>()
            .await
            .map_err(|error| classify(&endpoint, error))
    }

    /// Perform one device-REST request.
    pub async fn device(
        &self,
        config: &ServerConfig,
        request: &DeviceRequest,
    ) -> GatewayResult<Value> {
        let endpoint = config.endpoint(&request.path);
        debug!(%endpoint, method = %request.method, "sending device request");
        let mut builder = authorize(self.http.request(request.method.clone(), &endpoint), config)
            .timeout(config.timeout)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = send(builder, &endpoint).await?;
        Ok(read_body(response, &endpoint).await?)
    }

    /// Plain `GET` against a server path, returning the response untouched
    /// apart from the status check.
    pub async fn get(&self, config: &ServerConfig, path: &str) -> Result<Response, UpstreamError> {
        let endpoint = config.endpoint(path);
        let builder = authorize(self.http.get(&endpoint), config).timeout(config.timeout);
        send(builder, &endpoint).await
    }
}

fn authorize(builder: RequestBuilder, config: &ServerConfig) -> RequestBuilder {
    match &config.auth_token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn send(builder: RequestBuilder, endpoint: &str) -> Result<Response, UpstreamError> {
    let response = builder
        .send()
        .await
        .map_err(|error| classify(endpoint, error))?;
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

async fn read_body(response: Response, endpoint: &str) -> Result<Value, UpstreamError> {
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));
    let text = response
        .text()
        .await
        .map_err(|error| classify(endpoint, error))?;
    if !is_json {
        return Ok(json!({ "text": text }));
    }
    serde_json::from_str(&text).map_err(|error| UpstreamError::Decode {
        endpoint: endpoint.to_owned(),
        message: error.to_string(),
    })
}

/// Map a reqwest failure onto the upstream taxonomy.
pub fn classify(endpoint: &str, error: reqwest::Error) -> UpstreamError {
    let endpoint = endpoint.to_owned();
    if error.is_timeout() {
        UpstreamError::Timeout { endpoint }
    } else if error.is_decode() {
        UpstreamError::Decode {
            endpoint,
            message: error.to_string(),
        }
    } else if let Some(status) = error.status() {
        UpstreamError::Status {
            endpoint,
            status: status.as_u16(),
        }
    } else {
        UpstreamError::Connect {
            endpoint,
            message: error.to_string(),
        }
    }
}

fn string_arg(arguments: &Value, key: &str, default: &str) -> String {
    match arguments.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => default.to_owned(),
        Some(other) => other.to_string(),
    }
}

fn integer_arg(arguments: &Value, key: &str, default: i64) -> GatewayResult<i64> {
    let invalid = || GatewayError::validation(format!("'{key}' must be an integer"));
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64))
            .ok_or_else(invalid),
        Some(Value::String(text)) => text.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn query_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server(base_url: &str, transport: Transport) -> ServerConfig {
        ServerConfig::new("plants", base_url, transport).with_timeout(Duration::from_secs(2))
    }

    #[test]
    fn device_operations_map_to_requests() {
        let relay = DeviceOperation::parse("relay_set", &json!({"ch": "B", "state": "on"}))
            .unwrap()
            .request();
        assert_eq!(relay.path, "/api/relays/set");
        assert_eq!(
            relay.query,
            vec![("ch".to_owned(), "B".to_owned()), ("state".to_owned(), "on".to_owned())]
        );

        let off = DeviceOperation::parse("pump_control", &json!({"off": 1}))
            .unwrap()
            .request();
        assert_eq!(off.query, vec![("off".to_owned(), "1".to_owned())]);

        let run = DeviceOperation::parse("pump_control", &json!({"sec": "7"}))
            .unwrap()
            .request();
        assert_eq!(
            run.query,
            vec![("ch".to_owned(), "A".to_owned()), ("sec".to_owned(), "7".to_owned())]
        );
    }

    #[test]
    fn http_request_passthrough_defaults() {
        let request = DeviceOperation::parse("http_request", &json!({"query": {"n": 2}, "body": "x"}))
            .unwrap()
            .request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/api");
        assert_eq!(request.query, vec![("n".to_owned(), "2".to_owned())]);
        assert!(request.body.is_none());
    }

    #[test]
    fn unknown_device_operation_is_validation_error() {
        let error = DeviceOperation::parse("self_destruct", &json!({})).unwrap_err();
        assert!(matches!(error, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn json_rpc_call_wraps_tools_call_and_sends_bearer() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": {"name": "water", "arguments": {"zone": 1}}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": "x", "result": {"done": true}})),
            )
            .expect(1)
            .mount(&mock)
            .await;

        let config = server(&mock.uri(), Transport::JsonRpc).with_auth_token("secret");
        let result = RemoteToolClient::new()
            .call(&config, "water", json!({"zone": 1}))
            .await
            .unwrap();
        assert_eq!(result, json!({"done": true}));
    }

    #[tokio::test]
    async fn json_rpc_error_member_is_remote_failure() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"jsonrpc": "2.0", "id": "x", "error": {"code": -32000, "message": "busy"}}),
            ))
            .mount(&mock)
            .await;

        let error = RemoteToolClient::new()
            .call(&server(&mock.uri(), Transport::JsonRpc), "water", json!({}))
            .await
            .unwrap_err();
        match error {
            GatewayError::Upstream(UpstreamError::Remote { server, payload }) => {
                assert_eq!(server, "plants");
                assert_eq!(payload["message"], "busy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn device_call_parses_json_and_wraps_text() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/soil"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"soil": [41, 38]})))
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/watering_pumps"))
            .and(query_param("off", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pumps off"))
            .mount(&mock)
            .await;

        let client = RemoteToolClient::new();
        let config = server(&mock.uri(), Transport::DeviceRest);
        let soil = client.call(&config, "api_soil", json!({})).await.unwrap();
        assert_eq!(soil, json!({"soil": [41, 38]}));
        let pumps = client
            .call(&config, "pump_control", json!({"off": true}))
            .await
            .unwrap();
        assert_eq!(pumps, json!({"text": "pumps off"}));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock)
            .await;

        let error = RemoteToolClient::new()
            .call(&server(&mock.uri(), Transport::DeviceRest), "api_dht", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            GatewayError::Upstream(UpstreamError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock)
            .await;

        let config = server(&mock.uri(), Transport::DeviceRest)
            .with_timeout(Duration::from_millis(50));
        let error = RemoteToolClient::new()
            .call(&config, "api_overview", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            GatewayError::Upstream(UpstreamError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn device_servers_list_fixed_catalogue() {
        let config = server("http://unused.invalid", Transport::DeviceRest);
        let listing = RemoteToolClient::new().list_tools(&config).await.unwrap();
        let names: Vec<&str> = listing["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"pump_control"));
    }
}
