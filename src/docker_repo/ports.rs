// Map Docker container summaries to published host ports.

use crate::models::ContainerPort;
use bollard::models::{ContainerSummary, PortSummaryTypeEnum as PortTypeEnum};

/// Published (host-mapped) ports of one container. Exposed-only ports are skipped, and the
/// IPv4/IPv6 pair Docker reports for each mapping collapses to one row.
pub(crate) fn published_ports(c: &ContainerSummary) -> Vec<ContainerPort> {
    let id = c.id.clone().unwrap_or_default();
    let name = c
        .names
        .as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.chars().take(12).collect());
    let status = c.status.clone().unwrap_or_default();

    let mut out: Vec<ContainerPort> = Vec::new();
    for p in c.ports.iter().flatten() {
        let Some(host_port) = p.public_port else {
            continue;
        };
        let protocol = match p.typ {
            Some(PortTypeEnum::UDP) => "udp",
            Some(PortTypeEnum::SCTP) => "sctp",
            _ => "tcp",
        };
        if out
            .iter()
            .any(|e| e.host_port == host_port && e.protocol == protocol)
        {
            continue;
        }
        out.push(ContainerPort {
            container_id: id.clone(),
            container_name: name.clone(),
            status: status.clone(),
            host_port,
            container_port: p.private_port,
            protocol: protocol.to_string(),
            host_address: p.ip.clone().unwrap_or_else(|| "0.0.0.0".into()),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::PortSummary as Port;

    fn port(ip: &str, private: u16, public: Option<u16>, typ: PortTypeEnum) -> Port {
        Port {
            ip: Some(ip.to_string()),
            private_port: private,
            public_port: public,
            typ: Some(typ),
        }
    }

    #[test]
    fn collapses_ipv6_duplicates_and_skips_unpublished() {
        let c = ContainerSummary {
            id: Some("0123456789abcdef".into()),
            names: Some(vec!["/web".into()]),
            status: Some("Up 2 hours".into()),
            ports: Some(vec![
                port("0.0.0.0", 80, Some(8080), PortTypeEnum::TCP),
                port("::", 80, Some(8080), PortTypeEnum::TCP),
                port("0.0.0.0", 53, Some(5353), PortTypeEnum::UDP),
                port("", 9000, None, PortTypeEnum::TCP),
            ]),
            ..Default::default()
        };
        let ports = published_ports(&c);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].container_name, "web");
        assert_eq!(ports[0].host_port, 8080);
        assert_eq!(ports[0].container_port, 80);
        assert_eq!(ports[0].protocol, "tcp");
        assert_eq!(ports[0].host_address, "0.0.0.0");
        assert_eq!(ports[0].status, "Up 2 hours");
        assert_eq!(ports[1].protocol, "udp");
    }

    #[test]
    fn unnamed_container_falls_back_to_short_id() {
        let c = ContainerSummary {
            id: Some("0123456789abcdef".into()),
            ports: Some(vec![port("0.0.0.0", 5432, Some(5432), PortTypeEnum::TCP)]),
            ..Default::default()
        };
        assert_eq!(published_ports(&c)[0].container_name, "0123456789ab");
    }

    #[test]
    fn container_without_ports_yields_nothing() {
        assert!(published_ports(&ContainerSummary::default()).is_empty());
    }
}
