use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub ports: PortsConfig,
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Max probes in flight at once within a cycle.
    #[serde(default = "default_concurrency_ceiling")]
    pub concurrency_ceiling: usize,
    /// Wait for a single echo reply; the probe budget adds a small margin on top.
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
    /// Start the cycle loop at boot instead of waiting for POST /api/monitor/start.
    #[serde(default)]
    pub autostart: bool,
    /// Addresses or hostnames registered at boot.
    #[serde(default)]
    pub targets: Vec<String>,
    /// How often to log monitor stats (cycles, targets, frame subscribers) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_cycle_interval_ms() -> u64 {
    1000
}

fn default_concurrency_ceiling() -> usize {
    32
}

fn default_ping_timeout_ms() -> u64 {
    2000
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            concurrency_ceiling: default_concurrency_ceiling(),
            ping_timeout_ms: default_ping_timeout_ms(),
            autostart: false,
            targets: Vec::new(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortsConfig {
    /// Fill in full command lines for listening processes (extra sysinfo work per refresh).
    #[serde(default)]
    pub include_command: bool,
    /// Names hidden by `excludeSystem` on top of the built-in list.
    #[serde(default)]
    pub extra_system_processes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of frames kept in the broadcast channel for /ws/frames (slow clients may lag).
    pub broadcast_capacity: usize,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {path}: {e}"))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.server.host.is_empty(),
            "server.host must be non-empty"
        );
        anyhow::ensure!(
            self.monitoring.cycle_interval_ms > 0,
            "monitoring.cycle_interval_ms must be > 0, got {}",
            self.monitoring.cycle_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.concurrency_ceiling > 0,
            "monitoring.concurrency_ceiling must be > 0, got {}",
            self.monitoring.concurrency_ceiling
        );
        anyhow::ensure!(
            self.monitoring.ping_timeout_ms > 0,
            "monitoring.ping_timeout_ms must be > 0, got {}",
            self.monitoring.ping_timeout_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        if let Some(blank) = self.monitoring.targets.iter().position(|t| t.trim().is_empty()) {
            anyhow::bail!("monitoring.targets[{blank}] must be non-empty");
        }
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        Ok(())
    }
}
