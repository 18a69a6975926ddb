// Render-ready frame contract and scheduler state

use serde::{Deserialize, Serialize};

/// Scheduler lifecycle: Idle -> Running -> Stopped -> Running ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEntry {
    pub address: String,
    /// Oldest first; `None` marks a lost probe.
    pub history: Vec<Option<f64>>,
    pub last_value_ms: Option<f64>,
    pub loss_rate: f64,
    pub average_ms: Option<f64>,
}

/// Immutable view of every target's metrics as of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Sequence number of the cycle that produced this frame; `None` before the first cycle.
    pub cycle: Option<u64>,
    /// Unix millis at which the frame was taken.
    pub timestamp: u64,
    pub entries: Vec<FrameEntry>,
}
