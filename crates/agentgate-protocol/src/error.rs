//! Error types shared across the gateway.

use serde_json::Value;
use thiserror::Error;

/// Failure talking to a remote tool or device server.
///
/// Timeouts and connection failures are separate variants so callers can
/// report them differently.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("timeout while calling {endpoint}")]
    Timeout { endpoint: String },
    #[error("connection to {endpoint} failed: {message}")]
    Connect { endpoint: String, message: String },
    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("remote error from {server}: {payload}")]
    Remote { server: String, payload: Value },
    #[error("malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

/// Errors that can occur in gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("translation error: {0}")]
    Translation(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation(message.into())
    }
}

/// Convenience result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
