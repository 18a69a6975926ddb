// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::history_repo::HistoryRepo;
use crate::merger::PortMerger;
use crate::probe_repo::ProbeGateway;
use crate::registry::TargetRegistry;
use crate::scheduler::CycleScheduler;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TargetRegistry>,
    pub history: Arc<HistoryRepo>,
    pub scheduler: CycleScheduler,
    pub merger: Arc<PortMerger>,
    pub gateway: Arc<dyn ProbeGateway>,
    pub ws_frame_connections: Arc<AtomicUsize>,
    pub config: AppConfig,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/api/targets",
            get(http::list_targets).post(http::add_target),
        ) // GET, POST /api/targets
        .route("/api/targets/discover", post(http::discover_targets)) // POST /api/targets/discover
        .route("/api/targets/{address}", delete(http::remove_target)) // DELETE /api/targets/{address}
        .route("/api/interfaces", get(http::list_interfaces)) // GET /api/interfaces
        .route("/api/monitor", get(http::monitor_status)) // GET /api/monitor
        .route("/api/monitor/start", post(http::start_monitor)) // POST /api/monitor/start
        .route("/api/monitor/stop", post(http::stop_monitor)) // POST /api/monitor/stop
        .route("/api/frame", get(http::latest_frame)) // GET /api/frame
        .route("/api/ports", get(http::list_ports)) // GET /api/ports
        .route("/api/ports/grouped", get(http::list_ports_grouped)) // GET /api/ports/grouped
        .route("/api/ports/export", get(http::export_ports)) // GET /api/ports/export
        .route("/api/traceroute/{address}", get(http::traceroute)) // GET /api/traceroute/{address}
        .route("/api/scan/{address}", get(http::scan_ports)) // GET /api/scan/{address}
        .route("/ws/frames", get(ws::ws_frames)) // WS /ws/frames
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Runs `server` until it ends or `shutdown` fires, then drains the scheduler either way.
/// A server error is returned only after the drain.
pub async fn serve_until_shutdown<S, F>(
    server: S,
    shutdown: F,
    scheduler: &CycleScheduler,
) -> std::io::Result<()>
where
    S: IntoFuture<Output = std::io::Result<()>>,
    F: Future<Output = ()>,
{
    let served = tokio::select! {
        result = server.into_future() => result,
        _ = shutdown => {
            tracing::info!("Received shutdown signal");
            Ok(())
        }
    };
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server stopped");
    }
    scheduler.shutdown().await;
    served
}
