//! Remote tool plumbing: the server registry, the HTTP/JSON-RPC client that
//! talks to registered servers, and the device tools handed to the agent.

pub mod client;
pub mod connectivity;
pub mod jsonrpc;
pub mod registry;
pub mod toolkit;

pub use client::{DEVICE_CATALOGUE, DeviceOperation, DeviceRequest, PumpCommand, RemoteToolClient};
pub use connectivity::ConnectivityReport;
pub use jsonrpc::{JsonRpcRequest, JsonRpcResponse};
pub use registry::ServerRegistry;
pub use toolkit::DeviceToolkit;
