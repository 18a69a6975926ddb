// Host listening ports via OS tools, enriched from the sysinfo process table.

mod parse;

use crate::error::{MonitorError, MonitorResult};
use crate::models::HostPort;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::instrument;

const TOOL_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait HostPortSource: Send + Sync {
    /// Listening sockets on this host. Fails with `ProbeUnavailable` if no enumeration tool can run.
    async fn list_host_ports(&self, include_command: bool) -> MonitorResult<Vec<HostPort>>;
}

pub struct SystemPortSource {
    sys: Arc<std::sync::Mutex<System>>,
}

impl Default for SystemPortSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPortSource {
    pub fn new() -> Self {
        Self {
            sys: Arc::new(std::sync::Mutex::new(System::new())),
        }
    }

    async fn run_tool(program: &str, args: &[&str]) -> MonitorResult<String> {
        let child = Command::new(program).args(args).kill_on_drop(true).output();
        match timeout(TOOL_TIMEOUT, child).await {
            Ok(Ok(out)) if out.status.success() => {
                Ok(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(Ok(out)) => Err(MonitorError::ProbeUnavailable(format!(
                "{program} exited with {}",
                out.status
            ))),
            Ok(Err(e)) => Err(MonitorError::ProbeUnavailable(format!("{program}: {e}"))),
            Err(_) => Err(MonitorError::ProbeUnavailable(format!(
                "{program}: no result within {}s",
                TOOL_TIMEOUT.as_secs()
            ))),
        }
    }

    #[cfg(target_os = "linux")]
    async fn raw_ports() -> MonitorResult<Vec<HostPort>> {
        match Self::run_tool("ss", &["-tlnp"]).await {
            Ok(out) => Ok(parse::parse_ss(&out)),
            Err(e) => {
                tracing::debug!(error = %e, "ss unavailable, falling back to lsof");
                let out = Self::run_tool("lsof", &["-i", "-P", "-n"]).await?;
                Ok(parse::parse_lsof(&out))
            }
        }
    }

    #[cfg(target_os = "windows")]
    async fn raw_ports() -> MonitorResult<Vec<HostPort>> {
        let out = Self::run_tool("netstat", &["-ano"]).await?;
        Ok(parse::parse_netstat(&out))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    async fn raw_ports() -> MonitorResult<Vec<HostPort>> {
        let out = Self::run_tool("lsof", &["-i", "-P", "-n"]).await?;
        Ok(parse::parse_lsof(&out))
    }

    /// Fills in full process names, owning users and (optionally) command lines by pid.
    async fn enrich(&self, ports: Vec<HostPort>, include_command: bool) -> MonitorResult<Vec<HostPort>> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| MonitorError::ProbeUnavailable(format!("sysinfo lock poisoned: {e}")))?;
            let mut pids: Vec<Pid> = ports.iter().filter_map(|p| p.pid).map(Pid::from_u32).collect();
            pids.sort();
            pids.dedup();
            if pids.is_empty() {
                return Ok(ports);
            }
            let mut kind = ProcessRefreshKind::nothing().with_user(UpdateKind::OnlyIfNotSet);
            if include_command {
                kind = kind.with_cmd(UpdateKind::OnlyIfNotSet);
            }
            sys.refresh_processes_specifics(ProcessesToUpdate::Some(&pids), true, kind);
            let users = Users::new_with_refreshed_list();

            Ok(ports
                .into_iter()
                .map(|mut port| {
                    let Some(process) = port.pid.and_then(|pid| sys.process(Pid::from_u32(pid)))
                    else {
                        return port;
                    };
                    let name = process.name().to_string_lossy();
                    if !name.is_empty() {
                        port.process_name = name.into_owned();
                    }
                    if let Some(user) = process
                        .user_id()
                        .and_then(|uid| users.get_user_by_id(uid))
                    {
                        port.user = user.name().to_string();
                    }
                    if include_command {
                        let cmd: Vec<String> = process
                            .cmd()
                            .iter()
                            .map(|a| a.to_string_lossy().into_owned())
                            .collect();
                        port.command = (!cmd.is_empty()).then(|| cmd.join(" "));
                    }
                    port
                })
                .collect())
        })
        .await
        .map_err(|e| MonitorError::ProbeUnavailable(format!("sysinfo task join: {e}")))?
    }
}

#[async_trait]
impl HostPortSource for SystemPortSource {
    #[instrument(skip(self), fields(repo = "ports", operation = "list_host_ports"))]
    async fn list_host_ports(&self, include_command: bool) -> MonitorResult<Vec<HostPort>> {
        let ports = Self::raw_ports().await?;
        self.enrich(ports, include_command).await
    }
}
