// Port inventory models: raw host/container listings, merged entries and filters

use serde::{Deserialize, Serialize};

/// A listening socket as reported by the host OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPort {
    pub port: u16,
    /// "IPv4" or "IPv6".
    pub protocol: String,
    /// Bind address; "*" for wildcard binds.
    pub address: String,
    pub pid: Option<u32>,
    pub process_name: String,
    pub user: String,
    #[serde(default)]
    pub command: Option<String>,
}

/// A host port published by a running container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_id: String,
    pub container_name: String,
    pub status: String,
    pub host_port: u16,
    pub container_port: u16,
    /// "tcp", "udp" or "sctp".
    pub protocol: String,
    pub host_address: String,
}

/// Where a published port comes from. Container inventory wins over host inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Provenance {
    Local,
    Container(String),
}

impl Provenance {
    pub fn is_container(&self) -> bool {
        matches!(self, Provenance::Container(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortEntry {
    pub port: u16,
    pub protocol: String,
    pub address: String,
    pub pid: Option<u32>,
    /// Raw process name from the host listing.
    pub process_name: String,
    /// Identity shown to the user and matched by filters: container name for container ports.
    pub display_name: String,
    pub user: String,
    pub command: Option<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceScope {
    #[default]
    All,
    LocalOnly,
    ContainerOnly,
}

impl SourceScope {
    pub fn admits(&self, provenance: &Provenance) -> bool {
        match self {
            SourceScope::All => true,
            SourceScope::LocalOnly => !provenance.is_container(),
            SourceScope::ContainerOnly => provenance.is_container(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub app_name_substring: Option<String>,
    #[serde(default)]
    pub exact_port: Option<u16>,
    #[serde(default)]
    pub exclude_system_processes: bool,
    #[serde(default)]
    pub source_scope: SourceScope,
}

/// Result of one merged, filtered refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortScan {
    pub scan_time: String,
    pub total_ports: usize,
    pub unique_apps: usize,
    pub ports: Vec<PortEntry>,
}

/// Ports grouped by displayed identity and pid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppGroup {
    pub name: String,
    pub pid: Option<u32>,
    pub ports: Vec<u16>,
    pub provenance: Provenance,
    pub command: Option<String>,
}
