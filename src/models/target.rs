// Monitored target models

use serde::{Deserialize, Serialize};

/// Optional attributes attached to a target by discovery or manual add.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMetadata {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub hardware_address: Option<String>,
    /// Reachability flag from the last discovery pass (manual adds default to true).
    #[serde(default = "default_online")]
    pub is_online: bool,
}

fn default_online() -> bool {
    true
}

impl TargetMetadata {
    pub fn online() -> Self {
        Self {
            is_online: true,
            ..Default::default()
        }
    }

    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            ..Self::online()
        }
    }
}

/// A monitored network address. The address is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub address: String,
    #[serde(flatten)]
    pub metadata: TargetMetadata,
}

impl Target {
    pub fn new(address: impl Into<String>, metadata: TargetMetadata) -> Self {
        Self {
            address: address.into(),
            metadata,
        }
    }
}
