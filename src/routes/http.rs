// HTTP handlers: version, targets, monitor control, frames, ports, one-shot probes

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use super::AppState;
use crate::error::MonitorError;
use crate::export::{ExportFormat, export_filename, render};
use crate::models::{
    DiscoveredDevice, FilterCriteria, NetworkInterface, SchedulerState, SourceScope, Target,
    TargetMetadata,
};
use crate::probe_repo::{current_subnet, scan_tcp_ports, well_known_ports};
use crate::version::{NAME, VERSION};

const SCAN_CONNECT_TIMEOUT: Duration = Duration::from_millis(800);
const SCAN_CONCURRENCY: usize = 128;

/// Maps core errors onto status codes with a `{ "error": ... }` body.
pub(super) struct ApiError(MonitorError);

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MonitorError::ResolutionError(_)
            | MonitorError::InvalidTarget(_)
            | MonitorError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
            MonitorError::AlreadyRunning => StatusCode::CONFLICT,
            MonitorError::ProbeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

pub(super) async fn list_targets(State(state): State<AppState>) -> Json<Vec<Target>> {
    Json(state.registry.list())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddTargetRequest {
    /// IP literal or hostname.
    target: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddTargetResponse {
    added: bool,
    target: Target,
}

/// POST /api/targets — resolves, then registers. 201 when new, 200 when already present.
/// A resolution failure leaves the registry untouched.
pub(super) async fn add_target(
    State(state): State<AppState>,
    Json(req): Json<AddTargetRequest>,
) -> Result<(StatusCode, Json<AddTargetResponse>), ApiError> {
    let resolved = state.gateway.resolve_target(&req.target).await?;
    let metadata = TargetMetadata {
        hostname: resolved.hostname,
        ..TargetMetadata::online()
    };
    let added = state
        .registry
        .add(resolved.resolved_address.clone(), metadata.clone());
    let target = state
        .registry
        .list()
        .into_iter()
        .find(|t| t.address == resolved.resolved_address)
        .unwrap_or_else(|| Target::new(resolved.resolved_address, metadata));
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(AddTargetResponse { added, target })))
}

/// DELETE /api/targets/{address} — stops monitoring and forgets the target's history.
pub(super) async fn remove_target(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> StatusCode {
    if state.registry.remove(&address) {
        state.history.remove(&address);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct DiscoverRequest {
    /// e.g. "192.168.1.0/24"; the local subnet when absent.
    subnet: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DiscoverResponse {
    subnet: String,
    devices: Vec<DiscoveredDevice>,
    added: usize,
}

/// POST /api/targets/discover — sweeps the subnet and registers every responding device.
pub(super) async fn discover_targets(
    State(state): State<AppState>,
    body: Option<Json<DiscoverRequest>>,
) -> Result<Json<DiscoverResponse>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let subnet = match req.subnet.filter(|s| !s.trim().is_empty()) {
        Some(subnet) => subnet,
        None => current_subnet(&state.gateway.local_interfaces().await?).ok_or_else(|| {
            MonitorError::InvalidTarget("no local IPv4 subnet detected; pass one explicitly".into())
        })?,
    };
    let devices = state.gateway.discover_devices(&subnet).await?;
    let added = devices
        .iter()
        .filter(|d| {
            state.registry.add(
                d.address.clone(),
                TargetMetadata {
                    hostname: d.hostname.clone(),
                    hardware_address: d.hardware_address.clone(),
                    is_online: d.is_online,
                },
            )
        })
        .count();
    tracing::info!(subnet = %subnet, found = devices.len(), added, "discovered targets registered");
    Ok(Json(DiscoverResponse {
        subnet,
        devices,
        added,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InterfacesResponse {
    interfaces: Vec<NetworkInterface>,
    current_subnet: Option<String>,
}

/// GET /api/interfaces — local IPv4 interfaces and the subnet discovery defaults to.
pub(super) async fn list_interfaces(
    State(state): State<AppState>,
) -> Result<Json<InterfacesResponse>, ApiError> {
    let interfaces = state.gateway.local_interfaces().await?;
    Ok(Json(InterfacesResponse {
        current_subnet: current_subnet(&interfaces),
        interfaces,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MonitorStatus {
    state: SchedulerState,
    cycles_completed: u64,
    targets: usize,
}

fn monitor_status_of(state: &AppState) -> MonitorStatus {
    MonitorStatus {
        state: state.scheduler.state(),
        cycles_completed: state.scheduler.cycles_completed(),
        targets: state.registry.len(),
    }
}

pub(super) async fn monitor_status(State(state): State<AppState>) -> Json<MonitorStatus> {
    Json(monitor_status_of(&state))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StartRequest {
    interval_ms: Option<u64>,
    concurrency_ceiling: Option<usize>,
}

/// POST /api/monitor/start — body optional; missing fields fall back to `[monitoring]` config.
pub(super) async fn start_monitor(
    State(state): State<AppState>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<MonitorStatus>, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let monitoring = &state.config.monitoring;
    state.scheduler.start(
        Duration::from_millis(req.interval_ms.unwrap_or(monitoring.cycle_interval_ms)),
        req.concurrency_ceiling
            .unwrap_or(monitoring.concurrency_ceiling),
    )?;
    Ok(Json(monitor_status_of(&state)))
}

pub(super) async fn stop_monitor(State(state): State<AppState>) -> Json<MonitorStatus> {
    state.scheduler.stop();
    Json(monitor_status_of(&state))
}

pub(super) async fn latest_frame(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.latest_frame())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PortQuery {
    app: Option<String>,
    port: Option<u16>,
    #[serde(default)]
    exclude_system: bool,
    #[serde(default)]
    scope: SourceScope,
}

impl From<PortQuery> for FilterCriteria {
    fn from(q: PortQuery) -> Self {
        FilterCriteria {
            app_name_substring: q.app.filter(|s| !s.trim().is_empty()),
            exact_port: q.port,
            exclude_system_processes: q.exclude_system,
            source_scope: q.scope,
        }
    }
}

/// GET /api/ports — merged host/container listening ports with filters applied.
pub(super) async fn list_ports(
    State(state): State<AppState>,
    Query(query): Query<PortQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let scan = state.merger.scan(&query.into()).await?;
    Ok(Json(scan))
}

pub(super) async fn list_ports_grouped(
    State(state): State<AppState>,
    Query(query): Query<PortQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let groups = state.merger.grouped(&query.into()).await?;
    Ok(Json(groups))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ExportQuery {
    #[serde(default)]
    format: ExportFormat,
}

/// GET /api/ports/export?format=csv|json|txt — the filtered scan as a downloadable file.
pub(super) async fn export_ports(
    State(state): State<AppState>,
    Query(export): Query<ExportQuery>,
    Query(query): Query<PortQuery>,
) -> Result<Response, ApiError> {
    let scan = state.merger.scan(&query.into()).await?;
    let body = match render(&scan, export.format) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, operation = "export_ports", "export failed");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response());
        }
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(export.format, chrono::Local::now())
    );
    Ok((
        [
            (header::CONTENT_TYPE, export.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub(super) async fn traceroute(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let resolved = state.gateway.resolve_target(&address).await?;
    let result = state.gateway.traceroute(&resolved.resolved_address).await?;
    Ok(Json(result))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ScanQuery {
    start: Option<u16>,
    end: Option<u16>,
}

/// GET /api/scan/{address}?start=&end= — TCP connect scan; no range means the well-known table.
pub(super) async fn scan_ports(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<ScanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ports: Vec<u16> = match (query.start, query.end) {
        (None, None) => well_known_ports(),
        (Some(start), end) => {
            let end = end.unwrap_or(start);
            if start == 0 || end < start {
                return Err(MonitorError::InvalidTarget(format!(
                    "invalid port range {start}-{end}"
                ))
                .into());
            }
            (start..=end).collect()
        }
        (None, Some(_)) => {
            return Err(MonitorError::InvalidTarget("end given without start".into()).into());
        }
    };
    let resolved = state.gateway.resolve_target(&address).await?;
    let ip: IpAddr = resolved.resolved_address.parse().map_err(|_| {
        MonitorError::InvalidTarget(format!("not an IP address: {}", resolved.resolved_address))
    })?;
    let results = scan_tcp_ports(ip, &ports, SCAN_CONNECT_TIMEOUT, SCAN_CONCURRENCY).await;
    Ok(Json(results))
}
