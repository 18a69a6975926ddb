// Probe gateway: the seam between the scheduler and the network probe collaborators.

mod discovery;
mod interfaces;
mod ping;
mod scan;
mod trace;

pub use interfaces::current_subnet;
pub use scan::{scan_tcp_ports, well_known_ports};

use crate::error::{MonitorError, MonitorResult};
use crate::models::{
    DiscoveredDevice, NetworkInterface, PingReply, ResolvedTarget, Sample, TracerouteResult,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::net::IpAddr;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::instrument;

const TRACEROUTE_TIMEOUT: Duration = Duration::from_secs(90);
const ARP_TIMEOUT: Duration = Duration::from_secs(10);
const REVERSE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);
const REVERSE_LOOKUP_CONCURRENCY: usize = 16;

#[async_trait]
pub trait ProbeGateway: Send + Sync {
    /// One echo with an internally bounded wait. A timeout is `Ok` with `success == false`.
    async fn ping_once(&self, address: &str, seq: u64) -> MonitorResult<PingReply>;

    async fn traceroute(&self, address: &str) -> MonitorResult<TracerouteResult>;

    async fn resolve_target(&self, text: &str) -> MonitorResult<ResolvedTarget>;

    async fn discover_devices(&self, subnet: &str) -> MonitorResult<Vec<DiscoveredDevice>>;

    /// Local IPv4 interfaces, real ones first, then fallback candidate subnets.
    async fn local_interfaces(&self) -> MonitorResult<Vec<NetworkInterface>>;
}

/// Runs one probe for the scheduler. Every failure mode (error, timeout, no reply, reply without a
/// parseable latency) becomes a lost sample; nothing is retried.
pub async fn probe_sample(
    gateway: &dyn ProbeGateway,
    address: &str,
    seq: u64,
    budget: Duration,
) -> Sample {
    match timeout(budget, gateway.ping_once(address, seq)).await {
        Ok(Ok(PingReply {
            success: true,
            latency_ms: Some(ms),
            ..
        })) if ms.is_finite() && ms >= 0.0 => Sample::reply(seq, ms),
        Ok(Ok(_)) => Sample::lost(seq),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, address, seq, operation = "ping_once", "probe failed");
            Sample::lost(seq)
        }
        Err(_) => {
            tracing::debug!(address, seq, operation = "ping_once", "probe exceeded its budget");
            Sample::lost(seq)
        }
    }
}

/// Gateway backed by the OS `ping`, `traceroute`/`tracert` and `arp` tools.
pub struct SystemProbeGateway {
    ping_timeout: Duration,
    sweep_concurrency: usize,
}

impl SystemProbeGateway {
    pub fn new(ping_timeout: Duration, sweep_concurrency: usize) -> Self {
        Self {
            ping_timeout,
            sweep_concurrency: sweep_concurrency.max(1),
        }
    }

    /// Runs a collaborator tool. `Ok(None)` means it was still running after `limit` and was killed.
    async fn run(program: &str, args: &[String], limit: Duration) -> MonitorResult<Option<Output>> {
        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();
        match timeout(limit, child).await {
            Ok(Ok(out)) => Ok(Some(out)),
            Ok(Err(e)) => Err(MonitorError::ProbeUnavailable(format!("{program}: {e}"))),
            Err(_) => Ok(None),
        }
    }

    async fn arp_table(&self) -> Vec<discovery::ArpEntry> {
        match Self::run("arp", &["-a".to_string()], ARP_TIMEOUT).await {
            Ok(Some(out)) => String::from_utf8_lossy(&out.stdout)
                .lines()
                .filter_map(discovery::parse_arp_line)
                .collect(),
            Ok(None) => {
                tracing::warn!(operation = "arp_table", "arp did not finish in time");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "arp_table", "ARP table unavailable");
                Vec::new()
            }
        }
    }

    async fn reverse_lookup(address: &str) -> Option<String> {
        let (program, args) = discovery::reverse_lookup_command(address);
        match Self::run(program, &args, REVERSE_LOOKUP_TIMEOUT).await {
            Ok(Some(out)) => discovery::parse_reverse_lookup(&String::from_utf8_lossy(&out.stdout)),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(error = %e, address, operation = "reverse_lookup", "lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl ProbeGateway for SystemProbeGateway {
    async fn ping_once(&self, address: &str, seq: u64) -> MonitorResult<PingReply> {
        let args = ping::ping_args(address, self.ping_timeout);
        // Allow the tool a little longer than its own wait before giving up on it.
        let limit = self.ping_timeout + Duration::from_millis(500);
        match Self::run("ping", &args, limit).await? {
            Some(out) => Ok(ping::parse_ping_reply(
                &String::from_utf8_lossy(&out.stdout),
                address,
                seq,
            )),
            None => Ok(PingReply::timeout(address, seq)),
        }
    }

    #[instrument(skip(self), fields(repo = "probe", operation = "traceroute"))]
    async fn traceroute(&self, address: &str) -> MonitorResult<TracerouteResult> {
        let (program, base) = trace::traceroute_command();
        let mut args: Vec<String> = base.into_iter().map(str::to_string).collect();
        args.push(address.to_string());
        let out = Self::run(program, &args, TRACEROUTE_TIMEOUT)
            .await?
            .ok_or_else(|| {
                MonitorError::ProbeUnavailable(format!(
                    "{program}: no result within {}s",
                    TRACEROUTE_TIMEOUT.as_secs()
                ))
            })?;
        Ok(trace::parse_traceroute(
            address,
            String::from_utf8_lossy(&out.stdout).into_owned(),
        ))
    }

    #[instrument(skip(self), fields(repo = "probe", operation = "resolve_target"))]
    async fn resolve_target(&self, text: &str) -> MonitorResult<ResolvedTarget> {
        resolve(text).await
    }

    #[instrument(skip(self), fields(repo = "probe", operation = "discover_devices"))]
    async fn discover_devices(&self, subnet: &str) -> MonitorResult<Vec<DiscoveredDevice>> {
        let hosts = discovery::sweep_hosts(subnet)?;
        let responders: Vec<String> = futures_util::stream::iter(hosts)
            .map(|ip| async move {
                let address = ip.to_string();
                let alive = matches!(
                    self.ping_once(&address, 0).await,
                    Ok(PingReply { success: true, .. })
                );
                alive.then_some(address)
            })
            .buffer_unordered(self.sweep_concurrency)
            .filter_map(|hit| async move { hit })
            .collect()
            .await;

        let arp: HashMap<String, discovery::ArpEntry> = self
            .arp_table()
            .await
            .into_iter()
            .map(|e| (e.address.clone(), e))
            .collect();

        let mut devices: Vec<DiscoveredDevice> = responders
            .into_iter()
            .map(|address| {
                let entry = arp.get(&address);
                DiscoveredDevice {
                    hardware_address: entry.map(|e| e.hardware_address.clone()),
                    hostname: entry.and_then(|e| e.hostname.clone()),
                    address,
                    is_online: true,
                }
            })
            .collect();
        // ARP rarely carries names on Linux/macOS; ask DNS for the rest.
        let unnamed: Vec<String> = devices
            .iter()
            .filter(|d| d.hostname.is_none())
            .map(|d| d.address.clone())
            .collect();
        let names: HashMap<String, String> = futures_util::stream::iter(unnamed)
            .map(|address| async move {
                let name = Self::reverse_lookup(&address).await;
                name.map(|n| (address, n))
            })
            .buffer_unordered(REVERSE_LOOKUP_CONCURRENCY)
            .filter_map(|hit| async move { hit })
            .collect()
            .await;
        for device in devices.iter_mut().filter(|d| d.hostname.is_none()) {
            device.hostname = names.get(&device.address).cloned();
        }

        devices.sort_by_key(|d| discovery::last_octet(&d.address));
        tracing::info!(
            subnet,
            devices = devices.len(),
            named = devices.iter().filter(|d| d.hostname.is_some()).count(),
            "discovery finished"
        );
        Ok(devices)
    }

    #[instrument(skip(self), fields(repo = "probe", operation = "local_interfaces"))]
    async fn local_interfaces(&self) -> MonitorResult<Vec<NetworkInterface>> {
        tokio::task::spawn_blocking(interfaces::system_interfaces)
            .await
            .map_err(|e| MonitorError::ProbeUnavailable(format!("interface query failed: {e}")))
    }
}

/// Literal IPs are accepted as-is; anything else goes through the system resolver.
pub async fn resolve(text: &str) -> MonitorResult<ResolvedTarget> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MonitorError::ResolutionError("empty target".into()));
    }
    if let Ok(ip) = text.parse::<IpAddr>() {
        return Ok(ResolvedTarget {
            original: text.to_string(),
            resolved_address: ip.to_string(),
            is_hostname: false,
            hostname: None,
        });
    }
    let mut addrs = tokio::net::lookup_host((text, 0))
        .await
        .map_err(|e| MonitorError::ResolutionError(format!("{text}: {e}")))?;
    let addr = addrs
        .next()
        .ok_or_else(|| MonitorError::ResolutionError(format!("{text}: no addresses")))?;
    Ok(ResolvedTarget {
        original: text.to_string(),
        resolved_address: addr.ip().to_string(),
        is_hostname: true,
        hostname: Some(text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(MonitorResult<PingReply>);

    #[async_trait]
    impl ProbeGateway for Fixed {
        async fn ping_once(&self, _address: &str, _seq: u64) -> MonitorResult<PingReply> {
            self.0.clone()
        }
        async fn traceroute(&self, _address: &str) -> MonitorResult<TracerouteResult> {
            Err(MonitorError::ProbeUnavailable("test".into()))
        }
        async fn resolve_target(&self, text: &str) -> MonitorResult<ResolvedTarget> {
            resolve(text).await
        }
        async fn discover_devices(&self, _subnet: &str) -> MonitorResult<Vec<DiscoveredDevice>> {
            Ok(Vec::new())
        }
        async fn local_interfaces(&self) -> MonitorResult<Vec<NetworkInterface>> {
            Ok(Vec::new())
        }
    }

    struct Hangs(AtomicUsize);

    #[async_trait]
    impl ProbeGateway for Hangs {
        async fn ping_once(&self, _address: &str, _seq: u64) -> MonitorResult<PingReply> {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
        async fn traceroute(&self, _address: &str) -> MonitorResult<TracerouteResult> {
            std::future::pending().await
        }
        async fn resolve_target(&self, _text: &str) -> MonitorResult<ResolvedTarget> {
            std::future::pending().await
        }
        async fn discover_devices(&self, _subnet: &str) -> MonitorResult<Vec<DiscoveredDevice>> {
            std::future::pending().await
        }
        async fn local_interfaces(&self) -> MonitorResult<Vec<NetworkInterface>> {
            std::future::pending().await
        }
    }

    fn reply(success: bool, latency_ms: Option<f64>) -> PingReply {
        PingReply {
            address: "10.0.0.2".into(),
            seq: 3,
            success,
            latency_ms,
            ttl: None,
        }
    }

    #[tokio::test]
    async fn successful_reply_becomes_latency_sample() {
        let gw = Fixed(Ok(reply(true, Some(12.0))));
        let s = probe_sample(&gw, "10.0.0.2", 3, Duration::from_secs(1)).await;
        assert_eq!(s, Sample::reply(3, 12.0));
    }

    #[tokio::test]
    async fn every_failure_mode_is_a_lost_sample() {
        for gw in [
            Fixed(Ok(reply(false, None))),
            Fixed(Ok(reply(true, None))),
            Fixed(Ok(reply(true, Some(-1.0)))),
            Fixed(Err(MonitorError::ProbeUnavailable("ping missing".into()))),
        ] {
            let s = probe_sample(&gw, "10.0.0.2", 3, Duration::from_secs(1)).await;
            assert_eq!(s, Sample::lost(3));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_probe_is_cut_off_at_the_budget() {
        let gw = Hangs(AtomicUsize::new(0));
        let s = probe_sample(&gw, "10.0.0.2", 9, Duration::from_millis(250)).await;
        assert_eq!(s, Sample::lost(9));
        assert_eq!(gw.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_accepts_literal_ip_and_rejects_empty() {
        let r = resolve(" 10.0.0.2 ").await.unwrap();
        assert_eq!(r.resolved_address, "10.0.0.2");
        assert!(!r.is_hostname);
        assert!(matches!(
            resolve("   ").await,
            Err(MonitorError::ResolutionError(_))
        ));
    }

    #[tokio::test]
    async fn resolve_localhost_name() {
        let r = resolve("localhost").await.unwrap();
        assert!(r.is_hostname);
        assert_eq!(r.hostname.as_deref(), Some("localhost"));
        assert!(r.resolved_address.parse::<IpAddr>().is_ok());
    }

    #[tokio::test]
    async fn system_interfaces_always_offer_a_sweep_target() {
        let gw = SystemProbeGateway::new(Duration::from_millis(100), 8);
        let ifaces = gw.local_interfaces().await.unwrap();
        assert!(!ifaces.is_empty());
        assert!(ifaces.iter().all(|i| i.subnet.ends_with(".0/24")));
    }

    #[tokio::test]
    async fn discovery_rejects_malformed_subnet() {
        let gw = SystemProbeGateway::new(Duration::from_millis(100), 8);
        assert!(matches!(
            gw.discover_devices("nope").await,
            Err(MonitorError::InvalidTarget(_))
        ));
    }
}
