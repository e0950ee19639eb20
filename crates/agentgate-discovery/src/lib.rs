//! Local-network discovery of tool-capable servers.
//!
//! - [`network`]: local address and subnet inference
//! - [`probe`]: JSON-RPC and device-REST probes
//! - [`scanner`]: bounded fan-out scan, dedup, registry promotion
//! - [`tools`]: agent tools over the above

pub mod network;
pub mod probe;
pub mod scanner;
pub mod tools;

pub use network::{NetworkInfo, network_info, parse_subnet};
pub use probe::{DiscoveredEndpoint, HttpProber, KNOWN_DEVICE_KEYS, Prober};
pub use scanner::{
    SCAN_CONCURRENCY, ScanRequest, ScanResult, SubnetScanner, dedup_by_lowest_latency,
    parse_ports, promote_into_registry,
};
pub use tools::discovery_tools;
