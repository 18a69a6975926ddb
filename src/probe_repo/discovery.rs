// LAN device discovery helpers: /24 subnet parsing, ARP table and reverse-lookup output parsing.

use crate::error::{MonitorError, MonitorResult};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArpEntry {
    pub address: String,
    pub hardware_address: String,
    pub hostname: Option<String>,
}

/// Host addresses .1 through .254 of a subnet written as `a.b.c.0/24` (or `a.b.c.x`).
pub(crate) fn sweep_hosts(subnet: &str) -> MonitorResult<Vec<Ipv4Addr>> {
    let base = subnet.trim().split('/').next().unwrap_or_default();
    let base: Ipv4Addr = base
        .parse()
        .map_err(|_| MonitorError::InvalidTarget(format!("not an IPv4 /24 subnet: {subnet}")))?;
    let [a, b, c, _] = base.octets();
    Ok((1..=254u8).map(|d| Ipv4Addr::new(a, b, c, d)).collect())
}

/// Parses `arp -a` output lines. Both BSD/Linux (`host (ip) at mac ...`) and Windows
/// (`ip  mac  dynamic`) layouts are understood; incomplete entries are dropped.
pub(crate) fn parse_arp_line(line: &str) -> Option<ArpEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }

    if let Some(ip_token) = parts.get(1).filter(|p| p.starts_with('(') && p.ends_with(')')) {
        let address = ip_token.trim_matches(|c| c == '(' || c == ')');
        address.parse::<Ipv4Addr>().ok()?;
        let at = parts.iter().position(|p| *p == "at")?;
        let hardware_address = normalize_mac(parts.get(at + 1)?)?;
        let hostname = Some(parts[0])
            .filter(|h| *h != "?")
            .map(str::to_string);
        return Some(ArpEntry {
            address: address.to_string(),
            hardware_address,
            hostname,
        });
    }

    let address = parts[0].parse::<Ipv4Addr>().ok()?;
    let hardware_address = normalize_mac(parts[1])?;
    Some(ArpEntry {
        address: address.to_string(),
        hardware_address,
        hostname: None,
    })
}

/// Lower-case, zero-padded, colon separated. Rejects "(incomplete)", broadcast and malformed values.
fn normalize_mac(raw: &str) -> Option<String> {
    let groups: Vec<&str> = raw.split([':', '-']).collect();
    if groups.len() != 6 {
        return None;
    }
    let mut out = Vec::with_capacity(6);
    for g in groups {
        if g.is_empty() || g.len() > 2 || !g.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        out.push(format!("{:0>2}", g.to_ascii_lowercase()));
    }
    let mac = out.join(":");
    if mac == "ff:ff:ff:ff:ff:ff" {
        return None;
    }
    Some(mac)
}

/// Reverse lookup tool for an address: `host` on Unix, `nslookup` on Windows.
pub(crate) fn reverse_lookup_command(address: &str) -> (&'static str, Vec<String>) {
    let program = if cfg!(target_os = "windows") {
        "nslookup"
    } else {
        "host"
    };
    (program, vec![address.to_string()])
}

/// Extracts the PTR name from `host` (`... domain name pointer name.`) or `nslookup`
/// (`... name = name.`) output. The trailing root dot is dropped.
pub(crate) fn parse_reverse_lookup(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|l| l.contains("domain name pointer") || l.contains("name ="))
        .filter_map(|l| l.split_whitespace().last())
        .map(|name| name.trim_end_matches('.'))
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

pub(crate) fn last_octet(address: &str) -> u8 {
    address
        .parse::<Ipv4Addr>()
        .map(|ip| ip.octets()[3])
        .unwrap_or(0)
}
