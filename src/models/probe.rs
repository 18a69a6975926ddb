// Results returned by the external probe collaborators

use serde::{Deserialize, Serialize};

/// Outcome of a single ICMP echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingReply {
    pub address: String,
    pub seq: u64,
    pub success: bool,
    pub latency_ms: Option<f64>,
    pub ttl: Option<u32>,
}

impl PingReply {
    pub fn timeout(address: &str, seq: u64) -> Self {
        Self {
            address: address.to_string(),
            seq,
            success: false,
            latency_ms: None,
            ttl: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceHop {
    pub index: u32,
    pub address: Option<String>,
    pub hostname: Option<String>,
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerouteResult {
    pub target: String,
    pub hops: Vec<TraceHop>,
    pub raw_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTarget {
    pub original: String,
    pub resolved_address: String,
    pub is_hostname: bool,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDevice {
    pub address: String,
    pub hardware_address: Option<String>,
    pub hostname: Option<String>,
    pub is_online: bool,
}

/// One port of a TCP connect scan against a remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePort {
    pub port: u16,
    pub is_open: bool,
    pub service: Option<String>,
}

/// A local IPv4 interface and the /24 a discovery sweep would cover from it.
/// Fallback candidates (common private ranges) have no interface address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    pub address: Option<String>,
    pub prefix_len: Option<u8>,
    pub subnet: String,
}
