// Domain models

mod frame;
mod metrics;
mod port;
mod probe;
mod target;

pub use frame::{Frame, FrameEntry, SchedulerState};
pub use metrics::{Sample, TargetStats};
pub use port::{
    AppGroup, ContainerPort, FilterCriteria, HostPort, PortEntry, PortScan, Provenance,
    SourceScope,
};
pub use probe::{
    DiscoveredDevice, NetworkInterface, PingReply, RemotePort, ResolvedTarget, TraceHop,
    TracerouteResult,
};
pub use target::{Target, TargetMetadata};
