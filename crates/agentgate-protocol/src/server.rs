//! Tool-capable server registrations.

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_RPC_PATH: &str = "/mcp";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Which call protocol a registered server speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    #[serde(alias = "mcp_jsonrpc")]
    JsonRpc,
    #[serde(alias = "esp32_rest")]
    DeviceRest,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JsonRpc => "json_rpc",
            Self::DeviceRest => "device_rest",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_rpc_path", alias = "mcp_path")]
    pub rpc_path: String,
    #[serde(
        rename = "timeout_seconds",
        default = "default_timeout",
        with = "duration_secs"
    )]
    pub timeout: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_rpc_path() -> String {
    DEFAULT_RPC_PATH.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, transport: Transport) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            transport,
            rpc_path: default_rpc_path(),
            timeout: DEFAULT_TIMEOUT,
            auth_token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::validation("server name must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::validation("base_url must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(GatewayError::validation("timeout_seconds must be > 0"));
        }
        Ok(())
    }

    /// Join `path` onto the base URL with exactly one slash between them.
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn rpc_endpoint(&self) -> String {
        self.endpoint(&self.rpc_path)
    }
}

pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(D::Error::custom)
    }
}
