// Shared test helpers: scripted collaborators standing in for ping, ss/lsof and Docker.
#![allow(dead_code)]

use async_trait::async_trait;
use netpulse::docker_repo::ContainerPortSource;
use netpulse::error::{MonitorError, MonitorResult};
use netpulse::history_repo::HistoryRepo;
use netpulse::models::*;
use netpulse::ports_repo::HostPortSource;
use netpulse::probe_repo::{ProbeGateway, resolve};
use netpulse::registry::TargetRegistry;
use netpulse::scheduler::{CycleScheduler, SchedulerConfig, SchedulerDeps};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// How a scripted target answers: latency in ms, or `None` for no reply.
#[derive(Clone, Copy)]
pub struct Script {
    pub latency_ms: Option<f64>,
    pub delay: Duration,
}

/// Probe gateway with per-address scripted answers. Unscripted addresses never reply.
/// Tracks the highest number of pings in flight at once.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, Script>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: Mutex<Vec<(String, u64)>>,
    pub devices: Vec<DiscoveredDevice>,
    pub interfaces: Vec<NetworkInterface>,
    /// Subnets passed to `discover_devices`, in call order.
    pub swept: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, address: &str, latency_ms: f64) -> Self {
        self.script(address, Some(latency_ms), Duration::ZERO)
    }

    pub fn silent(self, address: &str) -> Self {
        self.script(address, None, Duration::ZERO)
    }

    pub fn script(self, address: &str, latency_ms: Option<f64>, delay: Duration) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), Script { latency_ms, delay });
        self
    }

    pub fn with_devices(mut self, devices: Vec<DiscoveredDevice>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_interfaces(mut self, interfaces: Vec<NetworkInterface>) -> Self {
        self.interfaces = interfaces;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProbeGateway for ScriptedGateway {
    async fn ping_once(&self, address: &str, seq: u64) -> MonitorResult<PingReply> {
        self.calls.lock().unwrap().push((address.to_string(), seq));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let script = self.scripts.lock().unwrap().get(address).copied();
        let script = script.unwrap_or(Script {
            latency_ms: None,
            delay: Duration::ZERO,
        });
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(match script.latency_ms {
            Some(ms) => PingReply {
                address: address.to_string(),
                seq,
                success: true,
                latency_ms: Some(ms),
                ttl: Some(64),
            },
            None => PingReply::timeout(address, seq),
        })
    }

    async fn traceroute(&self, address: &str) -> MonitorResult<TracerouteResult> {
        Ok(TracerouteResult {
            target: address.to_string(),
            hops: vec![TraceHop {
                index: 1,
                address: Some(address.to_string()),
                hostname: None,
                latency_ms: Some(1.5),
            }],
            raw_output: String::new(),
        })
    }

    async fn resolve_target(&self, text: &str) -> MonitorResult<ResolvedTarget> {
        if text.ends_with(".invalid") {
            return Err(MonitorError::ResolutionError(format!("{text}: not found")));
        }
        resolve(text).await
    }

    async fn discover_devices(&self, subnet: &str) -> MonitorResult<Vec<DiscoveredDevice>> {
        self.swept.lock().unwrap().push(subnet.to_string());
        Ok(self.devices.clone())
    }

    async fn local_interfaces(&self) -> MonitorResult<Vec<NetworkInterface>> {
        Ok(self.interfaces.clone())
    }
}

pub fn interface(name: &str, address: Option<&str>, subnet: &str) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        address: address.map(str::to_string),
        prefix_len: address.map(|_| 24),
        subnet: subnet.into(),
    }
}

pub struct FixedHostPorts(pub MonitorResult<Vec<HostPort>>);

#[async_trait]
impl HostPortSource for FixedHostPorts {
    async fn list_host_ports(&self, _include_command: bool) -> MonitorResult<Vec<HostPort>> {
        self.0.clone()
    }
}

pub struct FixedContainerPorts(pub MonitorResult<Vec<ContainerPort>>);

#[async_trait]
impl ContainerPortSource for FixedContainerPorts {
    async fn list_container_ports(&self) -> MonitorResult<Vec<ContainerPort>> {
        self.0.clone()
    }
}

pub fn host_port(port: u16, process_name: &str) -> HostPort {
    HostPort {
        port,
        protocol: "IPv4".into(),
        address: "*".into(),
        pid: Some(1000 + port as u32),
        process_name: process_name.into(),
        user: "alice".into(),
        command: None,
    }
}

pub fn container_port(host_port: u16, name: &str) -> ContainerPort {
    ContainerPort {
        container_id: format!("{name}-0123456789ab"),
        container_name: name.into(),
        status: "Up 2 hours".into(),
        host_port,
        container_port: 80,
        protocol: "tcp".into(),
        host_address: "0.0.0.0".into(),
    }
}

pub struct Harness {
    pub registry: Arc<TargetRegistry>,
    pub history: Arc<HistoryRepo>,
    pub gateway: Arc<ScriptedGateway>,
    pub scheduler: CycleScheduler,
}

pub fn harness(gateway: ScriptedGateway, addresses: &[&str]) -> Harness {
    let registry = Arc::new(TargetRegistry::new());
    for a in addresses {
        registry.add(*a, TargetMetadata::online());
    }
    let history = Arc::new(HistoryRepo::new());
    let gateway = Arc::new(gateway);
    let (frames_tx, _) = broadcast::channel(16);
    let scheduler = CycleScheduler::new(
        SchedulerDeps {
            registry: registry.clone(),
            history: history.clone(),
            gateway: gateway.clone(),
            frames_tx,
        },
        SchedulerConfig {
            probe_timeout: Duration::from_secs(5),
            stats_log_interval: Duration::from_secs(60),
        },
    );
    Harness {
        registry,
        history,
        gateway,
        scheduler,
    }
}
