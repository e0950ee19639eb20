//! Per host:port protocol probes.
//!
//! A probe answers "does this port speak the transport?" and nothing else.
//! Every failure (connect, timeout, 5xx, wrong body) is a negative result.

use agentgate_protocol::{DEFAULT_RPC_PATH, Transport};
use agentgate_tools::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Top-level `/api` keys that identify a device firmware.
pub const KNOWN_DEVICE_KEYS: [&str; 7] = [
    "soil", "dht", "relays", "modules", "status", "firmware", "uptime",
];

const MAX_DETAIL_KEYS: usize = 8;

/// One positive probe hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredEndpoint {
    pub transport: Transport,
    pub base_url: String,
    pub rpc_path: String,
    pub timeout_seconds: f64,
    pub latency_ms: u64,
    pub details: Value,
}

/// `http://host` on port 80, `http://host:port` otherwise.
pub fn base_url(host: Ipv4Addr, port: u16) -> String {
    if port == 80 {
        format!("http://{host}")
    } else {
        format!("http://{host}:{port}")
    }
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe_json_rpc(
        &self,
        host: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> Option<DiscoveredEndpoint>;

    async fn probe_device_rest(
        &self,
        host: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> Option<DiscoveredEndpoint>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpProber {
    http: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe_json_rpc(
        &self,
        host: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> Option<DiscoveredEndpoint> {
        let base = base_url(host, port);
        let endpoint = format!("{base}{DEFAULT_RPC_PATH}");
        let request = JsonRpcRequest::with_id("discovery", "tools/list", json!({}));
        let started = Instant::now();

        let response = self
            .http
            .post(&endpoint)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .inspect_err(|error| trace!(%endpoint, %error, "json-rpc probe failed"))
            .ok()?;
        if response.status().is_server_error() {
            return None;
        }
        let body: JsonRpcResponse = response.json().await.ok()?;
        if !body.is_v2() {
            return None;
        }

        Some(DiscoveredEndpoint {
            transport: Transport::JsonRpc,
            base_url: base,
            rpc_path: DEFAULT_RPC_PATH.to_owned(),
            timeout_seconds: timeout.as_secs_f64(),
            latency_ms: elapsed_ms(started),
            details: json!({ "tools_count": body.tools_count() }),
        })
    }

    async fn probe_device_rest(
        &self,
        host: Ipv4Addr,
        port: u16,
        timeout: Duration,
    ) -> Option<DiscoveredEndpoint> {
        let base = base_url(host, port);
        let endpoint = format!("{base}/api");
        let started = Instant::now();

        let response = self
            .http
            .get(&endpoint)
            .timeout(timeout)
            .send()
            .await
            .inspect_err(|error| trace!(%endpoint, %error, "device probe failed"))
            .ok()?;
        if response.status() != reqwest::StatusCode::OK {
            return None;
        }
        let body: Value = response.json().await.ok()?;
        let keys = device_keys(&body)?;

        Some(DiscoveredEndpoint {
            transport: Transport::DeviceRest,
            base_url: base,
            rpc_path: DEFAULT_RPC_PATH.to_owned(),
            timeout_seconds: timeout.as_secs_f64(),
            latency_ms: elapsed_ms(started),
            details: json!({ "keys": keys.into_iter().take(MAX_DETAIL_KEYS).collect::<Vec<_>>() }),
        })
    }
}

/// Sorted keys of a device `/api` body, or `None` when the body does not
/// look like a device.
///
/// A body whose only key is `detail` is an error payload from some other
/// web framework and is rejected even though it is a JSON object.
pub fn device_keys(body: &Value) -> Option<BTreeSet<String>> {
    let keys: BTreeSet<String> = body.as_object()?.keys().cloned().collect();
    if keys.len() == 1 && keys.contains("detail") {
        return None;
    }
    KNOWN_DEVICE_KEYS
        .iter()
        .any(|known| keys.contains(*known))
        .then_some(keys)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
