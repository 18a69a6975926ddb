// Port inventory export: CSV, JSON and plain-text renderings of a merged scan.

use crate::models::{PortEntry, PortScan, Provenance};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Txt => "text/plain; charset=utf-8",
        }
    }
}

/// `ports_<local timestamp>.<ext>`
pub fn export_filename(format: ExportFormat, now: chrono::DateTime<chrono::Local>) -> String {
    format!(
        "ports_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

pub fn render(scan: &PortScan, format: ExportFormat) -> anyhow::Result<String> {
    match format {
        ExportFormat::Csv => to_csv(&scan.ports),
        ExportFormat::Json => serde_json::to_string_pretty(scan).context("serialize port scan"),
        ExportFormat::Txt => Ok(to_txt(scan)),
    }
}

fn source_label(provenance: &Provenance) -> String {
    match provenance {
        Provenance::Local => "local".to_string(),
        Provenance::Container(name) => format!("container:{name}"),
    }
}

fn to_csv(ports: &[PortEntry]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "port", "protocol", "address", "pid", "process", "name", "user", "source", "command",
    ])?;
    for p in ports {
        wtr.write_record([
            p.port.to_string().as_str(),
            p.protocol.as_str(),
            p.address.as_str(),
            p.pid.map(|pid| pid.to_string()).unwrap_or_default().as_str(),
            p.process_name.as_str(),
            p.display_name.as_str(),
            p.user.as_str(),
            source_label(&p.provenance).as_str(),
            p.command.as_deref().unwrap_or(""),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush csv writer: {}", e.error()))?;
    String::from_utf8(bytes).context("csv output is not UTF-8")
}

fn to_txt(scan: &PortScan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Listening ports (scanned {})", scan.scan_time);
    let _ = writeln!(
        out,
        "{} ports, {} apps",
        scan.total_ports, scan.unique_apps
    );
    let _ = writeln!(out, "{}", "=".repeat(80));
    for p in &scan.ports {
        let pid = p.pid.map(|pid| pid.to_string()).unwrap_or_else(|| "-".into());
        let _ = writeln!(
            out,
            "\n{:<6} {:<5} {:<24} pid {:<8} {}",
            p.port,
            p.protocol,
            p.display_name,
            pid,
            source_label(&p.provenance)
        );
        let _ = writeln!(out, "  address {}  user {}", p.address, p.user);
        if let Some(cmd) = &p.command {
            let _ = writeln!(out, "  command {cmd}");
        }
    }
    out
}
