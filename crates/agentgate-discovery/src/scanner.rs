//! Bounded fan-out subnet scanner.
//!
//! Hosts are scanned at most [`SCAN_CONCURRENCY`] at a time; within a host
//! each port runs both probes concurrently. Hits are deduplicated by
//! `(base_url, transport)` keeping the fastest and may be promoted into the
//! server registry.

use crate::network::{infer_subnet, local_ipv4, parse_subnet};
use crate::probe::{DiscoveredEndpoint, HttpProber, Prober};
use agentgate_protocol::{GatewayError, GatewayResult, ServerConfig, Transport};
use agentgate_tools::ServerRegistry;
use futures_util::{StreamExt, stream};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

pub const SCAN_CONCURRENCY: usize = 32;
pub const DEFAULT_PORTS_CSV: &str = "80,8000,8080,8090";
pub const DEFAULT_PROBE_TIMEOUT_SECONDS: f64 = 1.2;
pub const DEFAULT_MAX_HOSTS: i64 = 64;
pub const DEFAULT_NAME_PREFIX: &str = "discovered";

/// Scan parameters as callers send them. Validated by [`SubnetScanner::scan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRequest {
    pub subnet_cidr: String,
    pub ports_csv: String,
    pub timeout_seconds: f64,
    pub max_hosts: i64,
    pub save: bool,
    pub name_prefix: String,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            subnet_cidr: String::new(),
            ports_csv: DEFAULT_PORTS_CSV.to_owned(),
            timeout_seconds: DEFAULT_PROBE_TIMEOUT_SECONDS,
            max_hosts: DEFAULT_MAX_HOSTS,
            save: false,
            name_prefix: DEFAULT_NAME_PREFIX.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    /// The scanned network in CIDR form with host bits cleared, so
    /// `10.0.0.7/30` is reported as `10.0.0.4/30`.
    pub subnet: String,
    pub hosts_scanned: usize,
    pub ports: Vec<u16>,
    pub timeout_seconds: f64,
    pub scan_ms: u64,
    pub found_count: usize,
    pub saved_count: usize,
    pub servers: Vec<DiscoveredEndpoint>,
}

/// Parse a port CSV: out-of-range values are dropped, the rest deduplicated
/// and sorted. Non-numeric tokens and an empty result are errors.
pub fn parse_ports(csv: &str) -> GatewayResult<Vec<u16>> {
    let mut ports = Vec::new();
    for token in csv.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let value: i64 = token
            .parse()
            .map_err(|_| GatewayError::validation(format!("invalid port '{token}'")))?;
        if let Ok(port) = u16::try_from(value)
            && port != 0
        {
            ports.push(port);
        }
    }
    ports.sort_unstable();
    ports.dedup();
    if ports.is_empty() {
        return Err(GatewayError::validation(
            "No valid ports to scan. Example: '80,8000,8080,8090'",
        ));
    }
    Ok(ports)
}

/// Keep the lowest-latency hit per `(base_url, transport)`, in first-seen
/// order.
pub fn dedup_by_lowest_latency(hits: Vec<DiscoveredEndpoint>) -> Vec<DiscoveredEndpoint> {
    let mut best: IndexMap<(String, Transport), DiscoveredEndpoint> = IndexMap::new();
    for hit in hits {
        let key = (hit.base_url.clone(), hit.transport);
        match best.get_mut(&key) {
            Some(current) if hit.latency_ms < current.latency_ms => *current = hit,
            Some(_) => {}
            None => {
                best.insert(key, hit);
            }
        }
    }
    best.into_values().collect()
}

/// Register discovered endpoints under generated names, skipping any whose
/// `(base_url, transport)` is already registered. Returns how many were saved.
pub fn promote_into_registry(
    registry: &ServerRegistry,
    endpoints: &[DiscoveredEndpoint],
    name_prefix: &str,
) -> usize {
    let mut names: HashSet<String> = registry.names().into_iter().collect();
    let mut saved = 0;
    for endpoint in endpoints {
        if registry.contains_endpoint(&endpoint.base_url, endpoint.transport) {
            continue;
        }
        let host_port = endpoint
            .base_url
            .rsplit("//")
            .next()
            .unwrap_or(&endpoint.base_url)
            .replace(':', "-");
        let stem = format!("{name_prefix}-{}-{host_port}", endpoint.transport);
        let mut name = stem.clone();
        let mut suffix = 2;
        while names.contains(&name) {
            name = format!("{stem}-{suffix}");
            suffix += 1;
        }

        let mut config = ServerConfig::new(&name, &endpoint.base_url, endpoint.transport);
        config.rpc_path = endpoint.rpc_path.clone();
        if let Ok(timeout) = Duration::try_from_secs_f64(endpoint.timeout_seconds) {
            config.timeout = timeout;
        }
        match registry.register(config) {
            Ok(()) => {
                names.insert(name);
                saved += 1;
            }
            Err(error) => warn!(%error, base_url = %endpoint.base_url, "skipping discovered server"),
        }
    }
    saved
}

#[derive(Clone)]
pub struct SubnetScanner {
    prober: Arc<dyn Prober>,
    registry: ServerRegistry,
    concurrency: usize,
}

impl SubnetScanner {
    pub fn new(registry: ServerRegistry) -> Self {
        Self::with_prober(registry, Arc::new(HttpProber::new()))
    }

    pub fn with_prober(registry: ServerRegistry, prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            registry,
            concurrency: SCAN_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip(self, request), fields(subnet = %request.subnet_cidr, save = request.save))]
    pub async fn scan(&self, request: ScanRequest) -> GatewayResult<ScanResult> {
        let subnet = if request.subnet_cidr.trim().is_empty() {
            infer_subnet(local_ipv4())
        } else {
            parse_subnet(&request.subnet_cidr)?
        };
        let ports = parse_ports(&request.ports_csv)?;
        if request.max_hosts <= 0 {
            return Err(GatewayError::validation("max_hosts must be > 0"));
        }
        let timeout = Duration::try_from_secs_f64(request.timeout_seconds)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .ok_or_else(|| GatewayError::validation("timeout_seconds must be > 0"))?;
        let max_hosts = usize::try_from(request.max_hosts).unwrap_or(usize::MAX);
        let hosts: Vec<Ipv4Addr> = subnet.hosts().take(max_hosts).collect();

        let started = Instant::now();
        let hits: Vec<DiscoveredEndpoint> = stream::iter(hosts.iter().copied())
            .map(|host| self.scan_host(host, &ports, timeout))
            .buffered(self.concurrency)
            .flat_map(stream::iter)
            .collect()
            .await;
        let servers = dedup_by_lowest_latency(hits);
        let scan_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let saved_count = if request.save {
            promote_into_registry(&self.registry, &servers, &request.name_prefix)
        } else {
            0
        };
        info!(
            hosts = hosts.len(),
            found = servers.len(),
            saved = saved_count,
            scan_ms,
            "subnet scan finished"
        );

        Ok(ScanResult {
            subnet: subnet.to_string(),
            hosts_scanned: hosts.len(),
            ports,
            timeout_seconds: request.timeout_seconds,
            scan_ms,
            found_count: servers.len(),
            saved_count,
            servers,
        })
    }

    async fn scan_host(
        &self,
        host: Ipv4Addr,
        ports: &[u16],
        timeout: Duration,
    ) -> Vec<DiscoveredEndpoint> {
        let mut found = Vec::new();
        for &port in ports {
            let (json_rpc, device) = tokio::join!(
                self.prober.probe_json_rpc(host, port, timeout),
                self.prober.probe_device_rest(host, port, timeout),
            );
            found.extend(json_rpc);
            found.extend(device);
        }
        found
    }
}
