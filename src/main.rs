use anyhow::Result;
use netpulse::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Headroom the scheduler grants a probe on top of the ping tool's own wait.
const PROBE_BUDGET_MARGIN: Duration = Duration::from_secs(1);
/// Parallel pings during a /24 discovery sweep.
const DISCOVERY_CONCURRENCY: usize = 64;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let monitoring = app_config.monitoring.clone();
    let (frames_tx, _) =
        broadcast::channel::<models::Frame>(app_config.publishing.broadcast_capacity);

    let ping_timeout = Duration::from_millis(monitoring.ping_timeout_ms);
    let gateway: Arc<dyn probe_repo::ProbeGateway> = Arc::new(
        probe_repo::SystemProbeGateway::new(ping_timeout, DISCOVERY_CONCURRENCY),
    );

    let registry = Arc::new(registry::TargetRegistry::new());
    for target in &monitoring.targets {
        match gateway.resolve_target(target).await {
            Ok(resolved) => {
                registry.add(
                    resolved.resolved_address,
                    models::TargetMetadata {
                        hostname: resolved.hostname,
                        ..models::TargetMetadata::online()
                    },
                );
            }
            Err(e) => tracing::warn!(error = %e, target = %target, "skipping configured target"),
        }
    }
    let history = Arc::new(history_repo::HistoryRepo::new());

    let scheduler = scheduler::CycleScheduler::new(
        scheduler::SchedulerDeps {
            registry: registry.clone(),
            history: history.clone(),
            gateway: gateway.clone(),
            frames_tx,
        },
        scheduler::SchedulerConfig {
            probe_timeout: ping_timeout + PROBE_BUDGET_MARGIN,
            stats_log_interval: Duration::from_secs(monitoring.stats_log_interval_secs),
        },
    );
    if monitoring.autostart {
        scheduler.start(
            Duration::from_millis(monitoring.cycle_interval_ms),
            monitoring.concurrency_ceiling,
        )?;
    }

    let containers: Arc<dyn docker_repo::ContainerPortSource> =
        match docker_repo::DockerRepo::connect() {
            Ok(repo) => Arc::new(repo),
            Err(e) => {
                tracing::warn!(error = %e, "Docker client unavailable; container ports disabled");
                Arc::new(docker_repo::NoContainerRuntime)
            }
        };
    let merger = Arc::new(merger::PortMerger::new(
        Arc::new(ports_repo::SystemPortSource::new()),
        containers,
        app_config.ports.include_command,
        &app_config.ports.extra_system_processes,
    ));

    let app = routes::app(routes::AppState {
        registry,
        history,
        scheduler: scheduler.clone(),
        merger,
        gateway,
        ws_frame_connections: Arc::new(AtomicUsize::new(0)),
        config: app_config.clone(),
    });
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    routes::serve_until_shutdown(axum::serve(listener, app), shutdown_signal(), &scheduler).await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
