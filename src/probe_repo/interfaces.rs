// Local interface detection: which /24 subnets a discovery sweep can target from this host.

use crate::models::NetworkInterface;
use std::net::{IpAddr, Ipv4Addr};
use sysinfo::Networks;

/// Offered after the real interfaces so a sweep target can be picked even on odd hosts.
const FALLBACK_SUBNETS: &[(&str, &str)] = &[
    ("192.168.1.x", "192.168.1.0/24"),
    ("192.168.0.x", "192.168.0.0/24"),
    ("10.0.0.x", "10.0.0.0/24"),
];

/// Reads every interface address via `sysinfo`. Blocking; call from `spawn_blocking`.
pub(crate) fn system_interfaces() -> Vec<NetworkInterface> {
    let networks = Networks::new_with_refreshed_list();
    let addrs: Vec<(String, IpAddr, u8)> = networks
        .list()
        .iter()
        .flat_map(|(name, data)| {
            data.ip_networks()
                .iter()
                .map(move |n| (name.clone(), n.addr, n.prefix))
        })
        .collect();
    interfaces_from(addrs)
}

/// Keeps usable IPv4 addresses (no loopback, no link-local), one entry per /24, sorted by
/// interface name, then appends the fallback subnets not already covered.
pub(crate) fn interfaces_from(
    addrs: impl IntoIterator<Item = (String, IpAddr, u8)>,
) -> Vec<NetworkInterface> {
    let mut usable: Vec<(String, Ipv4Addr, u8)> = addrs
        .into_iter()
        .filter_map(|(name, addr, prefix)| match addr {
            IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_link_local() && !v4.is_unspecified() => {
                Some((name, v4, prefix))
            }
            _ => None,
        })
        .collect();
    usable.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut out: Vec<NetworkInterface> = Vec::new();
    for (name, v4, prefix) in usable {
        let subnet = subnet_of(v4);
        if out.iter().any(|i| i.subnet == subnet) {
            continue;
        }
        out.push(NetworkInterface {
            name,
            address: Some(v4.to_string()),
            prefix_len: Some(prefix),
            subnet,
        });
    }
    for (name, subnet) in FALLBACK_SUBNETS {
        if !out.iter().any(|i| i.subnet == *subnet) {
            out.push(NetworkInterface {
                name: name.to_string(),
                address: None,
                prefix_len: None,
                subnet: subnet.to_string(),
            });
        }
    }
    out
}

/// Subnet of the first interface that has a real address.
pub fn current_subnet(interfaces: &[NetworkInterface]) -> Option<String> {
    interfaces
        .iter()
        .find(|i| i.address.is_some())
        .map(|i| i.subnet.clone())
}

fn subnet_of(v4: Ipv4Addr) -> String {
    let [a, b, c, _] = v4.octets();
    format!("{a}.{b}.{c}.0/24")
}
