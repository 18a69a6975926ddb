// Port source merger: host listing + container listing -> one provenance-tagged, filtered view.
// Merge and filters are pure functions over the two inventories; nothing is cached between refreshes.

use crate::docker_repo::ContainerPortSource;
use crate::error::MonitorResult;
use crate::models::{
    AppGroup, ContainerPort, FilterCriteria, HostPort, PortEntry, PortScan, Provenance,
};
use crate::ports_repo::HostPortSource;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Process names hidden by `excludeSystemProcesses` (compared case-insensitively).
pub const SYSTEM_PROCESSES: &[&str] = &[
    // macOS
    "launchd",
    "kernel_task",
    "windowserver",
    "loginwindow",
    "systemuiserver",
    "finder",
    "dock",
    "cfprefsd",
    "mds",
    "mds_stores",
    "controlce",
    "controlcenter",
    "rapportd",
    "netdisk_s",
    // Linux
    "init",
    "systemd",
    "systemd-resolve",
    "sshd",
    "dbus",
    "dbus-daemon",
    "networkmanager",
    "gnome-shell",
    "kwin",
    // Windows
    "system",
    "csrss.exe",
    "wininit.exe",
    "services",
    "services.exe",
    "lsass",
    "lsass.exe",
    "svchost",
    "svchost.exe",
    "dwm.exe",
    "explorer.exe",
];

pub struct PortMerger {
    host: Arc<dyn HostPortSource>,
    containers: Arc<dyn ContainerPortSource>,
    include_command: bool,
    deny_list: Vec<String>,
}

impl PortMerger {
    pub fn new(
        host: Arc<dyn HostPortSource>,
        containers: Arc<dyn ContainerPortSource>,
        include_command: bool,
        extra_system_processes: &[String],
    ) -> Self {
        let mut deny_list: Vec<String> = SYSTEM_PROCESSES
            .iter()
            .map(|s| s.to_string())
            .chain(extra_system_processes.iter().map(|s| s.to_lowercase()))
            .collect();
        deny_list.sort();
        deny_list.dedup();
        Self {
            host,
            containers,
            include_command,
            deny_list,
        }
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny_list
    }

    /// Pulls both inventories, merges them and applies `criteria`.
    /// Host listing failures propagate; container listing failures degrade to "no containers".
    pub async fn refresh(&self, criteria: &FilterCriteria) -> MonitorResult<Vec<PortEntry>> {
        let host = self
            .host
            .list_host_ports(self.include_command)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, operation = "list_host_ports", "host port listing failed");
            })?;
        let containers = match self.containers.list_container_ports().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = "list_container_ports",
                    "container ports unavailable; merging host ports only"
                );
                Vec::new()
            }
        };
        let merged = merge(host, &containers);
        Ok(apply_filters(merged, criteria, &self.deny_list))
    }

    pub async fn scan(&self, criteria: &FilterCriteria) -> MonitorResult<PortScan> {
        Ok(summarize(self.refresh(criteria).await?))
    }

    pub async fn grouped(&self, criteria: &FilterCriteria) -> MonitorResult<Vec<AppGroup>> {
        Ok(group_by_app(&self.refresh(criteria).await?))
    }
}

/// Tags every host port with its provenance. A host port whose number is published by a container
/// is attributed to that container (first container in listing order wins on collisions).
pub fn merge(host: Vec<HostPort>, containers: &[ContainerPort]) -> Vec<PortEntry> {
    let mut by_port: HashMap<u16, &str> = HashMap::with_capacity(containers.len());
    for c in containers {
        by_port.entry(c.host_port).or_insert(c.container_name.as_str());
    }

    let mut entries: Vec<PortEntry> = host
        .into_iter()
        .map(|h| {
            let (display_name, provenance) = match by_port.get(&h.port) {
                Some(name) => (name.to_string(), Provenance::Container(name.to_string())),
                None => (h.process_name.clone(), Provenance::Local),
            };
            PortEntry {
                port: h.port,
                protocol: h.protocol,
                address: h.address,
                pid: h.pid,
                process_name: h.process_name,
                display_name,
                user: h.user,
                command: h.command,
                provenance,
            }
        })
        .collect();
    entries.sort_by(|a, b| {
        a.port
            .cmp(&b.port)
            .then_with(|| a.protocol.cmp(&b.protocol))
            .then_with(|| a.address.cmp(&b.address))
    });
    entries
}

pub fn matches(entry: &PortEntry, criteria: &FilterCriteria, deny_list: &[String]) -> bool {
    let name = entry.display_name.to_lowercase();
    if let Some(needle) = criteria
        .app_name_substring
        .as_deref()
        .filter(|s| !s.is_empty())
        && !name.contains(&needle.to_lowercase())
    {
        return false;
    }
    if criteria.exact_port.is_some_and(|p| p != entry.port) {
        return false;
    }
    if criteria.exclude_system_processes && deny_list.iter().any(|d| *d == name) {
        return false;
    }
    criteria.source_scope.admits(&entry.provenance)
}

pub fn apply_filters(
    entries: Vec<PortEntry>,
    criteria: &FilterCriteria,
    deny_list: &[String],
) -> Vec<PortEntry> {
    entries
        .into_iter()
        .filter(|e| matches(e, criteria, deny_list))
        .collect()
}

pub fn summarize(ports: Vec<PortEntry>) -> PortScan {
    let unique_apps: HashSet<(&str, Option<u32>)> = ports
        .iter()
        .map(|p| (p.display_name.as_str(), p.pid))
        .collect();
    PortScan {
        scan_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        total_ports: ports.len(),
        unique_apps: unique_apps.len(),
        ports,
    }
}

/// Groups entries by (displayed identity, pid), lowest port first.
pub fn group_by_app(entries: &[PortEntry]) -> Vec<AppGroup> {
    let mut groups: BTreeMap<(String, Option<u32>), AppGroup> = BTreeMap::new();
    for e in entries {
        let group = groups
            .entry((e.display_name.clone(), e.pid))
            .or_insert_with(|| AppGroup {
                name: e.display_name.clone(),
                pid: e.pid,
                ports: Vec::new(),
                provenance: e.provenance.clone(),
                command: None,
            });
        group.ports.push(e.port);
        if group.command.is_none() {
            group.command = e.command.clone();
        }
    }
    let mut out: Vec<AppGroup> = groups
        .into_values()
        .map(|mut g| {
            g.ports.sort_unstable();
            g.ports.dedup();
            g
        })
        .collect();
    out.sort_by_key(|g| g.ports.first().copied().unwrap_or(0));
    out
}
