// Probe samples and rolling statistics

use serde::{Deserialize, Serialize};

/// One probe outcome for one target in one cycle. `latency_ms == None` marks a lost probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub seq: u64,
    pub latency_ms: Option<f64>,
}

impl Sample {
    pub fn reply(seq: u64, latency_ms: f64) -> Self {
        Self {
            seq,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn lost(seq: u64) -> Self {
        Self {
            seq,
            latency_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStats {
    pub sent: u64,
    pub received: u64,
    /// (sent - received) / sent; 0 when nothing was sent.
    pub loss_rate: f64,
    pub average_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub last_value_ms: Option<f64>,
}
