//! Environment-sourced settings shared by the API server and the CLI.

use agentgate_kernel::GatewayBuilder;
use agentgate_protocol::ServerConfig;
use agentgate_runtime::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use agentgate_runtime::{HistoryStrategy, OpenAiConfig, OutputSanitizerConfig, SanitizerConfig};
use axum::http::HeaderValue;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::warn;

const SERVERS_ENV: &str = "AGENTGATE_SERVERS_JSON";

#[derive(Debug, Clone, Args)]
pub struct Settings {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Initial servers: a JSON array or a single JSON object.
    #[arg(long, env = SERVERS_ENV, default_value = "[]")]
    pub servers_json: String,

    /// Comma list or JSON array of allowed origins.
    #[arg(long, env = "CORS_ALLOW_ORIGINS", default_value = "*")]
    pub cors_allow_origins: String,

    #[arg(
        long,
        env = "CORS_ALLOW_CREDENTIALS",
        default_value = "false",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub cors_allow_credentials: bool,

    /// Replace every agent call with a deterministic canned trace.
    #[arg(
        long,
        env = "AGENT_FAKE_MODE",
        default_value = "false",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub fake_mode: bool,

    #[arg(long, env = "AGENT_MAX_HISTORY_MESSAGES", default_value_t = 24)]
    pub max_history_messages: usize,

    #[arg(long, env = "AGENT_HISTORY_STRATEGY", default_value = "truncate")]
    pub history_strategy: HistoryStrategy,

    /// Clear assistant tool calls from the history returned by invoke.
    #[arg(
        long,
        env = "AGENT_REMOVE_TOOL_INPUTS",
        default_value = "false",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub remove_tool_inputs: bool,

    /// Drop tool results from the history returned by invoke.
    #[arg(
        long,
        env = "AGENT_REMOVE_TOOL_OUTPUTS",
        default_value = "false",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub remove_tool_outputs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_owned(),
            openai_base_url: DEFAULT_BASE_URL.to_owned(),
            servers_json: "[]".to_owned(),
            cors_allow_origins: "*".to_owned(),
            cors_allow_credentials: false,
            fake_mode: false,
            max_history_messages: 24,
            history_strategy: HistoryStrategy::Truncate,
            remove_tool_inputs: false,
            remove_tool_outputs: false,
        }
    }
}

impl Settings {
    pub fn openai(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self
                .openai_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model: self.openai_model.clone(),
            base_url: self.openai_base_url.clone(),
        }
    }

    pub fn sanitizer(&self) -> SanitizerConfig {
        SanitizerConfig {
            strategy: self.history_strategy,
            max_messages: self.max_history_messages.max(1),
            ..SanitizerConfig::default()
        }
    }

    pub fn output_sanitizer(&self) -> OutputSanitizerConfig {
        OutputSanitizerConfig {
            remove_tool_inputs: self.remove_tool_inputs,
            remove_tool_outputs: self.remove_tool_outputs,
        }
    }

    pub fn cors(&self) -> CorsSettings {
        CorsSettings {
            allow_origins: parse_cors_origins(&self.cors_allow_origins),
            allow_credentials: self.cors_allow_credentials,
        }
    }

    /// A gateway builder seeded from these settings, plus the warnings raised
    /// while reading the initial server list.
    pub fn builder(&self) -> (GatewayBuilder, Vec<String>) {
        let (servers, warnings) = parse_servers_json(&self.servers_json);
        for warning in &warnings {
            warn!(%warning, "ignoring part of the initial server list");
        }
        let builder = GatewayBuilder::new()
            .servers(servers)
            .openai(self.openai())
            .sanitizer(self.sanitizer())
            .output_sanitizer(self.output_sanitizer())
            .fake_mode(self.fake_mode);
        (builder, warnings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsSettings {
    pub allow_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl CorsSettings {
    pub fn is_wildcard(&self) -> bool {
        self.allow_origins.iter().any(|origin| origin == "*")
    }

    /// Credentials are never combined with a wildcard origin.
    pub fn credentials_enabled(&self) -> bool {
        self.allow_credentials && !self.is_wildcard()
    }

    pub fn layer(&self) -> CorsLayer {
        if self.is_wildcard() {
            return CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
        }

        let origins: Vec<HeaderValue> = self
            .allow_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(%origin, %error, "skipping invalid CORS origin");
                    None
                }
            })
            .collect();
        let layer = CorsLayer::new().allow_origin(AllowOrigin::list(origins));
        if self.credentials_enabled() {
            layer
                .allow_credentials(true)
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
        } else {
            layer.allow_methods(Any).allow_headers(Any)
        }
    }
}

/// Accepts `a,b,c` or `["a","b"]`. Anything empty or unreadable means `*`.
pub fn parse_cors_origins(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let origins: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
    } else {
        raw.split(',').map(str::to_owned).collect()
    };
    let origins: Vec<String> = origins
        .into_iter()
        .map(|origin| origin.trim().to_owned())
        .filter(|origin| !origin.is_empty())
        .collect();
    if origins.is_empty() {
        vec!["*".to_owned()]
    } else {
        origins
    }
}

/// Read the initial server list. Bad input is reported as warnings and
/// skipped; this never fails.
pub fn parse_servers_json(raw: &str) -> (Vec<ServerConfig>, Vec<String>) {
    let mut warnings = Vec::new();
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .unwrap_or(trimmed)
        .trim();
    if unquoted.is_empty() {
        return (Vec::new(), warnings);
    }

    let entries = match serde_json::from_str::<Value>(unquoted) {
        Ok(Value::Array(items)) => items,
        Ok(object @ Value::Object(_)) => vec![object],
        Ok(other) => {
            warnings.push(format!(
                "{SERVERS_ENV} must be a JSON object or array. Got {}",
                json_kind(&other)
            ));
            return (Vec::new(), warnings);
        }
        Err(error) => {
            warnings.push(format!(
                "{SERVERS_ENV} is not valid JSON ({error}); starting with no servers"
            ));
            return (Vec::new(), warnings);
        }
    };

    let mut servers = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ServerConfig>(entry)
            .map_err(|error| error.to_string())
            .and_then(|config| {
                config
                    .validate()
                    .map(|()| config)
                    .map_err(|error| error.to_string())
            });
        match parsed {
            Ok(config) => servers.push(config),
            Err(error) => warnings.push(format!("Skipping {SERVERS_ENV}[{idx}]: {error}")),
        }
    }
    (servers, warnings)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
