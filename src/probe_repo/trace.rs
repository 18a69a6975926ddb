// Traceroute invocation and hop parsing.

use crate::models::{TraceHop, TracerouteResult};
use std::net::IpAddr;

pub(super) fn traceroute_command() -> (&'static str, Vec<&'static str>) {
    #[cfg(target_os = "windows")]
    {
        ("tracert", vec!["-d", "-w", "1000"])
    }
    #[cfg(not(target_os = "windows"))]
    {
        ("traceroute", vec!["-n", "-w", "2", "-q", "1"])
    }
}

pub(crate) fn parse_traceroute(target: &str, raw_output: String) -> TracerouteResult {
    let hops = raw_output.lines().filter_map(parse_hop_line).collect();
    TracerouteResult {
        target: target.to_string(),
        hops,
        raw_output,
    }
}

/// Parses one hop line: index, first address, last latency. A "*" line without an address is a silent hop.
fn parse_hop_line(line: &str) -> Option<TraceHop> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let index = parts.next()?.parse::<u32>().ok()?;

    let mut address = None;
    let mut latency_ms = None;
    for part in parts {
        if part.parse::<IpAddr>().is_ok() {
            if address.is_none() {
                address = Some(part.to_string());
            }
        } else if let Ok(ms) = part.parse::<f64>() {
            latency_ms = Some(ms);
        }
    }

    if address.is_none() && line.contains('*') {
        return Some(TraceHop {
            index,
            address: None,
            hostname: None,
            latency_ms: None,
        });
    }
    if address.is_none() && latency_ms.is_none() {
        return None;
    }
    Some(TraceHop {
        index,
        address,
        hostname: None,
        latency_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIX_OUTPUT: &str = "traceroute to 1.1.1.1 (1.1.1.1), 64 hops max, 52 byte packets\n \
        1  192.168.1.1  1.234 ms\n \
        2  *\n \
        3  10.20.0.1  8.5 ms\n";

    #[test]
    fn parses_unix_hops_including_silent_ones() {
        let result = parse_traceroute("1.1.1.1", UNIX_OUTPUT.to_string());
        assert_eq!(result.target, "1.1.1.1");
        assert_eq!(result.hops.len(), 3);
        assert_eq!(result.hops[0].index, 1);
        assert_eq!(result.hops[0].address.as_deref(), Some("192.168.1.1"));
        assert_eq!(result.hops[0].latency_ms, Some(1.234));
        assert_eq!(result.hops[1].address, None);
        assert_eq!(result.hops[1].latency_ms, None);
        assert_eq!(result.hops[2].latency_ms, Some(8.5));
        assert!(result.raw_output.starts_with("traceroute to"));
    }

    #[test]
    fn parses_windows_tracert_line() {
        let hop = parse_hop_line("  1     2 ms     1 ms    <1 ms  192.168.1.1").unwrap();
        assert_eq!(hop.index, 1);
        assert_eq!(hop.address.as_deref(), Some("192.168.1.1"));
        assert_eq!(hop.latency_ms, Some(1.0));
    }

    #[test]
    fn header_lines_are_skipped() {
        assert!(parse_hop_line("Tracing route to one.one.one.one [1.1.1.1]").is_none());
        assert!(parse_hop_line("").is_none());
    }
}
