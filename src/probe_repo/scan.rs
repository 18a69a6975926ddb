// TCP connect scan against a remote host.

use crate::models::RemotePort;
use futures_util::StreamExt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Well-known port names reported for open ports. Unlisted ports carry no service name.
const WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (111, "RPC"),
    (139, "NetBIOS"),
    (143, "IMAP"),
    (161, "SNMP"),
    (389, "LDAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (465, "SMTPS"),
    (587, "SMTP-Submit"),
    (636, "LDAPS"),
    (873, "rsync"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (1194, "OpenVPN"),
    (1433, "MSSQL"),
    (1521, "Oracle"),
    (1883, "MQTT"),
    (2375, "Docker"),
    (2376, "Docker-TLS"),
    (2379, "etcd"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5672, "RabbitMQ"),
    (5900, "VNC"),
    (6379, "Redis"),
    (6443, "K8s-API"),
    (8080, "HTTP-Alt"),
    (8443, "HTTPS-Alt"),
    (8883, "MQTT-TLS"),
    (9092, "Kafka"),
    (9200, "Elasticsearch"),
    (10250, "Kubelet"),
    (11211, "Memcached"),
    (27017, "MongoDB"),
];

pub fn service_name(port: u16) -> Option<&'static str> {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

pub fn well_known_ports() -> Vec<u16> {
    WELL_KNOWN_PORTS.iter().map(|(p, _)| *p).collect()
}

/// Connects to every port with at most `concurrency` attempts in flight. Sorted by port.
pub async fn scan_tcp_ports(
    ip: IpAddr,
    ports: &[u16],
    connect_timeout: Duration,
    concurrency: usize,
) -> Vec<RemotePort> {
    let mut results: Vec<RemotePort> = futures_util::stream::iter(ports.iter().copied())
        .map(|port| async move {
            let addr = SocketAddr::new(ip, port);
            let is_open = matches!(
                timeout(connect_timeout, TcpStream::connect(addr)).await,
                Ok(Ok(_))
            );
            RemotePort {
                port,
                is_open,
                service: is_open
                    .then(|| service_name(port).map(str::to_string))
                    .flatten(),
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|r| r.port);
    tracing::debug!(
        operation = "scan_tcp_ports",
        ip = %ip,
        scanned = results.len(),
        open = results.iter().filter(|r| r.is_open).count(),
        "TCP scan finished"
    );
    results
}
