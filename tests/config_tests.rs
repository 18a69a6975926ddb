// Config loading and validation tests

use netpulse::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8090
host = "0.0.0.0"

[monitoring]
cycle_interval_ms = 2000
concurrency_ceiling = 16
ping_timeout_ms = 1500
autostart = true
targets = ["10.0.0.2", "router.lan"]
stats_log_interval_secs = 30

[ports]
include_command = true
extra_system_processes = ["Dropbox"]

[publishing]
broadcast_capacity = 16
"#;

const MINIMAL_CONFIG: &str = r#"
[server]
port = 8090
host = "127.0.0.1"

[publishing]
broadcast_capacity = 4
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.monitoring.cycle_interval_ms, 2000);
    assert_eq!(config.monitoring.concurrency_ceiling, 16);
    assert_eq!(config.monitoring.ping_timeout_ms, 1500);
    assert!(config.monitoring.autostart);
    assert_eq!(config.monitoring.targets, vec!["10.0.0.2", "router.lan"]);
    assert!(config.ports.include_command);
    assert_eq!(config.ports.extra_system_processes, vec!["Dropbox"]);
    assert_eq!(config.publishing.broadcast_capacity, 16);
}

#[test]
fn test_config_defaults_when_sections_omitted() {
    let config = AppConfig::load_from_str(MINIMAL_CONFIG).expect("minimal config");
    assert_eq!(config.monitoring.cycle_interval_ms, 1000);
    assert_eq!(config.monitoring.concurrency_ceiling, 32);
    assert_eq!(config.monitoring.ping_timeout_ms, 2000);
    assert!(!config.monitoring.autostart);
    assert!(config.monitoring.targets.is_empty());
    assert_eq!(config.monitoring.stats_log_interval_secs, 60);
    assert!(!config.ports.include_command);
    assert!(config.ports.extra_system_processes.is_empty());
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8090", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_cycle_interval_zero() {
    let bad = VALID_CONFIG.replace("cycle_interval_ms = 2000", "cycle_interval_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.cycle_interval_ms"));
}

#[test]
fn test_config_validation_rejects_concurrency_ceiling_zero() {
    let bad = VALID_CONFIG.replace("concurrency_ceiling = 16", "concurrency_ceiling = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.concurrency_ceiling"));
}

#[test]
fn test_config_validation_rejects_ping_timeout_zero() {
    let bad = VALID_CONFIG.replace("ping_timeout_ms = 1500", "ping_timeout_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.ping_timeout_ms"));
}

#[test]
fn test_config_validation_rejects_stats_log_interval_zero() {
    let bad = VALID_CONFIG.replace("stats_log_interval_secs = 30", "stats_log_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.stats_log_interval_secs"));
}

#[test]
fn test_config_validation_rejects_blank_target() {
    let bad = VALID_CONFIG.replace("\"router.lan\"", "\"  \"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitoring.targets[1]"));
}

#[test]
fn test_config_validation_rejects_broadcast_capacity_zero() {
    let bad = VALID_CONFIG.replace("broadcast_capacity = 16", "broadcast_capacity = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("publishing.broadcast_capacity"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("[server\nport = 1").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("netpulse.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.monitoring.targets.len(), 2);
}
