// Parsers for OS listening-socket tools: `ss -tlnp`, `lsof -i -P -n`, `netstat -ano`.
// All return rows de-duplicated on (port, address, protocol) and sorted by port.

use crate::models::HostPort;
use std::collections::HashSet;

const UNKNOWN: &str = "-";

fn wildcard(address: &str) -> String {
    match address {
        "*" | "0.0.0.0" | "[::]" | "::" => "*".to_string(),
        other => other.to_string(),
    }
}

fn ip_family(address: &str) -> &'static str {
    if address.contains(':') { "IPv6" } else { "IPv4" }
}

fn split_addr_port(local: &str) -> Option<(&str, u16)> {
    let pos = local.rfind(':')?;
    let port = local[pos + 1..].parse().ok()?;
    Some((&local[..pos], port))
}

fn finish(mut ports: Vec<HostPort>) -> Vec<HostPort> {
    let mut seen = HashSet::new();
    ports.retain(|p| seen.insert((p.port, p.address.clone(), p.protocol.clone())));
    ports.sort_by(|a, b| {
        a.port
            .cmp(&b.port)
            .then_with(|| a.protocol.cmp(&b.protocol))
            .then_with(|| a.address.cmp(&b.address))
    });
    ports
}

/// `ss -tlnp`: `State Recv-Q Send-Q Local:Port Peer:Port Process`.
pub(crate) fn parse_ss(stdout: &str) -> Vec<HostPort> {
    let ports = stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return None;
            }
            let (raw_address, port) = split_addr_port(parts[3])?;
            // ss prints "%iface" suffixes on scoped binds, e.g. "127.0.0.53%lo".
            let raw_address = raw_address.split('%').next().unwrap_or(raw_address);
            let (process_name, pid) = parts
                .get(5)
                .map(|info| parse_ss_process(info))
                .unwrap_or((UNKNOWN.to_string(), None));
            Some(HostPort {
                port,
                protocol: ip_family(raw_address.trim_matches(|c| c == '[' || c == ']')).into(),
                address: wildcard(raw_address),
                pid,
                process_name,
                user: UNKNOWN.into(),
                command: None,
            })
        })
        .collect();
    finish(ports)
}

/// `users:(("nginx",pid=812,fd=6),...)` -> ("nginx", Some(812)).
fn parse_ss_process(info: &str) -> (String, Option<u32>) {
    let Some(start) = info.find("((\"") else {
        return (UNKNOWN.into(), None);
    };
    let rest = &info[start + 3..];
    let Some(end) = rest.find('"') else {
        return (UNKNOWN.into(), None);
    };
    let name = rest[..end].to_string();
    let pid = info.find("pid=").and_then(|p| {
        info[p + 4..]
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .and_then(|n| n.parse().ok())
    });
    (name, pid)
}

/// `lsof -i -P -n`: `COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME (LISTEN)`.
pub(crate) fn parse_lsof(stdout: &str) -> Vec<HostPort> {
    let ports = stdout
        .lines()
        .skip(1)
        .filter(|line| line.contains("LISTEN"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 9 {
                return None;
            }
            let (raw_address, port) = split_addr_port(parts[8])?;
            let protocol = if parts[4].contains('6') { "IPv6" } else { "IPv4" };
            Some(HostPort {
                port,
                protocol: protocol.into(),
                address: wildcard(raw_address),
                pid: parts[1].parse().ok(),
                process_name: parts[0].to_string(),
                user: parts[2].to_string(),
                command: None,
            })
        })
        .collect();
    finish(ports)
}

/// `netstat -ano` (Windows): `Proto Local Foreign State PID`.
pub(crate) fn parse_netstat(stdout: &str) -> Vec<HostPort> {
    let ports = stdout
        .lines()
        .filter(|line| line.contains("LISTENING"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return None;
            }
            let (raw_address, port) = split_addr_port(parts[1])?;
            let pid: Option<u32> = parts[4].parse().ok();
            Some(HostPort {
                port,
                protocol: if parts[0].contains('6') || raw_address.starts_with('[') {
                    "IPv6"
                } else {
                    "IPv4"
                }
                .into(),
                address: wildcard(raw_address),
                pid,
                process_name: pid.map(|p| p.to_string()).unwrap_or_else(|| UNKNOWN.into()),
                user: UNKNOWN.into(),
                command: None,
            })
        })
        .collect();
    finish(ports)
}
