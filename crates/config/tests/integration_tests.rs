use std::io::Write;

use stocklock_config::{validate_config, AppConfig, ConfigLoader, ConfigWatcher};

const FULL_TOML: &str = r#"
[service]
environment = "production"
log_level = "info"

[reservation]
ttl_secs = 300
sweep_interval_secs = 30
fail_open = false

[rate_limit]
window_secs = 60
default_ceiling = 10

[rate_limit.client_ceilings]
admin = 100
batch-import = 50

[inventory]
cache_ttl_secs = 30

[session]
idle_ttl_secs = 900
"#;

#[test]
fn test_full_config_round_trip() {
    let config = ConfigLoader::from_toml(FULL_TOML).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.reservation.ttl_secs, 300);
    assert_eq!(config.rate_limit.client_ceilings.len(), 2);
    assert_eq!(
        config.rate_limit.client_ceilings.get("batch-import"),
        Some(&50)
    );

    // Serialize back out and load again
    let serialized = toml::to_string(&config).unwrap();
    let reloaded = ConfigLoader::from_toml(&serialized).unwrap();
    assert_eq!(reloaded.reservation.ttl_secs, 300);
    assert_eq!(reloaded.session.idle_ttl_secs, 900);
}

#[test]
fn test_empty_config_uses_documented_defaults() {
    let config = ConfigLoader::from_toml("").unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.reservation.ttl_secs, 600);
    assert_eq!(config.reservation.sweep_interval_secs, 60);
    assert!(!config.reservation.fail_open);
    assert_eq!(config.rate_limit.window_secs, 60);
    assert_eq!(config.rate_limit.default_ceiling, 10);
    assert_eq!(config.inventory.cache_ttl_secs, 60);
    assert_eq!(config.session.idle_ttl_secs, 1800);
}

#[test]
fn test_merge_overlay_wins_but_ceilings_combine() {
    let base = ConfigLoader::from_toml(FULL_TOML).unwrap();

    let mut overlay = AppConfig::default();
    overlay.service.log_level = "debug".to_string();
    overlay
        .rate_limit
        .client_ceilings
        .insert("support".to_string(), 25);

    let merged = ConfigLoader::merge(base, overlay);
    assert_eq!(merged.service.log_level, "debug");
    assert_eq!(merged.rate_limit.client_ceilings.get("admin"), Some(&100));
    assert_eq!(merged.rate_limit.client_ceilings.get("support"), Some(&25));
}

#[tokio::test]
async fn test_watcher_serves_validated_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(FULL_TOML.as_bytes()).unwrap();
    file.flush().unwrap();

    let watcher = ConfigWatcher::new(file.path().to_path_buf()).unwrap();
    let config = watcher.get_config();

    assert_eq!(config.reservation.sweep_interval_secs, 30);
}

#[test]
fn test_invalid_file_is_rejected_up_front() {
    let invalid = FULL_TOML.replace("default_ceiling = 10", "default_ceiling = 0");
    let config = ConfigLoader::from_toml(&invalid).unwrap();
    assert!(validate_config(&config).is_err());
}
