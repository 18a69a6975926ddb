// Monitor error taxonomy

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// A collaborator (ping binary, port enumeration tool, Docker daemon) could not run at all.
    #[error("probe unavailable: {0}")]
    ProbeUnavailable(String),
    /// Manual target input could not be resolved to an address.
    #[error("cannot resolve target: {0}")]
    ResolutionError(String),
    #[error("monitor is already running")]
    AlreadyRunning,
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// Scheduler parameters that cannot drive a cycle loop (zero interval).
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
