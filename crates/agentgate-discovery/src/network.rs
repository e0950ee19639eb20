//! Local network inference.

use agentgate_protocol::{GatewayError, GatewayResult};
use ipnet::{IpNet, Ipv4Net};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::warn;

/// Snapshot of the local address and the subnet a scan would target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub local_ip: Ipv4Addr,
    pub inferred_subnet: Ipv4Net,
    pub selected_subnet: Ipv4Net,
    pub host_count: u64,
}

/// Address of the interface the OS would route public traffic through.
///
/// Connecting a UDP socket sends no packets; it only selects a route. Falls
/// back to loopback when no route exists.
pub fn local_ipv4() -> Ipv4Addr {
    let routed = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|address| address.ip());
    match routed {
        Ok(IpAddr::V4(ip)) => ip,
        Ok(IpAddr::V6(ip)) => {
            warn!(%ip, "outbound route is IPv6, using loopback");
            Ipv4Addr::LOCALHOST
        }
        Err(error) => {
            warn!(%error, "could not determine local address, using loopback");
            Ipv4Addr::LOCALHOST
        }
    }
}

/// The /24 containing `ip`.
pub fn infer_subnet(ip: Ipv4Addr) -> Ipv4Net {
    Ipv4Net::new(ip, 24)
        .map(|net| net.trunc())
        .unwrap_or_else(|_| Ipv4Net::from(ip))
}

/// Parse a CIDR (host bits allowed) or a bare address. IPv4 only.
pub fn parse_subnet(raw: &str) -> GatewayResult<Ipv4Net> {
    let raw = raw.trim();
    let parsed = if raw.contains('/') {
        raw.parse::<IpNet>()
            .map_err(|error| GatewayError::validation(format!("invalid subnet '{raw}': {error}")))?
    } else {
        let ip = raw
            .parse::<IpAddr>()
            .map_err(|error| GatewayError::validation(format!("invalid subnet '{raw}': {error}")))?;
        IpNet::from(ip)
    };
    match parsed {
        IpNet::V4(net) => Ok(net.trunc()),
        IpNet::V6(_) => Err(GatewayError::validation(format!(
            "only IPv4 subnets are supported, got '{raw}'"
        ))),
    }
}

/// The explicit subnet when given and non-blank, else the inferred one.
pub fn select_subnet(explicit: Option<&str>, inferred: Ipv4Net) -> GatewayResult<Ipv4Net> {
    match explicit.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_subnet(raw),
        None => Ok(inferred),
    }
}

/// Addresses in `net` minus network and broadcast, floored at zero.
pub fn host_count(net: Ipv4Net) -> u64 {
    let addresses = 1u64 << (32 - u32::from(net.prefix_len()));
    addresses.saturating_sub(2)
}

pub fn network_info(subnet: Option<&str>) -> GatewayResult<NetworkInfo> {
    let local_ip = local_ipv4();
    let inferred_subnet = infer_subnet(local_ip);
    let selected_subnet = select_subnet(subnet, inferred_subnet)?;
    Ok(NetworkInfo {
        local_ip,
        inferred_subnet,
        selected_subnet,
        host_count: host_count(selected_subnet),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_slash_24() {
        let net = infer_subnet(Ipv4Addr::new(192, 168, 4, 23));
        assert_eq!(net.to_string(), "192.168.4.0/24");
    }

    #[test]
    fn parse_accepts_host_bits_and_bare_addresses() {
        assert_eq!(parse_subnet("10.0.0.7/24").unwrap().to_string(), "10.0.0.0/24");
        assert_eq!(parse_subnet("10.0.0.7").unwrap().to_string(), "10.0.0.7/32");
    }

    #[test]
    fn parse_rejects_ipv6_and_garbage() {
        assert!(matches!(parse_subnet("fe80::/64"), Err(GatewayError::Validation(_))));
        assert!(matches!(parse_subnet("not-a-net"), Err(GatewayError::Validation(_))));
    }

    #[test]
    fn host_count_floors_at_zero() {
        assert_eq!(host_count(parse_subnet("10.0.0.0/24").unwrap()), 254);
        assert_eq!(host_count(parse_subnet("10.0.0.0/31").unwrap()), 0);
        assert_eq!(host_count(parse_subnet("10.0.0.1/32").unwrap()), 0);
        assert_eq!(host_count(parse_subnet("0.0.0.0/0").unwrap()), (1u64 << 32) - 2);
    }

    #[test]
    fn blank_explicit_subnet_falls_back() {
        let inferred = infer_subnet(Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(select_subnet(Some("  "), inferred).unwrap(), inferred);
        assert_eq!(select_subnet(None, inferred).unwrap(), inferred);
    }

    #[test]
    fn network_info_reports_selected_subnet() {
        let info = network_info(Some("172.16.0.0/30")).unwrap();
        assert_eq!(info.selected_subnet.to_string(), "172.16.0.0/30");
        assert_eq!(info.host_count, 2);
    }
}
