//! File-based configuration loading.

use std::io::Write;

use hermes_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::Builder;

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_a_complete_toml_file() {
    let file = write_file(
        ".toml",
        r#"
[service]
name = "users"
environment = "staging"

[dispatch]
slow_threshold_ms = 750

[logging]
level = "hermes_pipeline=debug,info"
format = "pretty"
include_location = true

[metrics]
enabled = true
addr = "127.0.0.1:9464"
listen = true
histogram_buckets = [0.01, 0.1, 1.0]
"#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.service.name, "users");
    assert_eq!(config.service.environment, "staging");
    assert_eq!(config.dispatch.slow_threshold_ms, 750);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config.logging.include_location);
    assert!(config.metrics.listen);
    assert_eq!(config.metrics.histogram_buckets, vec![0.01, 0.1, 1.0]);
}

#[test]
fn loads_a_partial_json_file_over_a_preset() {
    let file = write_file(".json", r#"{ "dispatch": { "slow_threshold_ms": 0 } }"#);

    let config = ConfigLoader::new()
        .with_production()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.dispatch.slow_threshold_ms, 0);
    assert!(config.metrics.enabled);
    assert_eq!(config.service.environment, "production");
}

#[test]
fn later_files_override_earlier_ones() {
    let base = write_file(".toml", "[logging]\nlevel = \"debug\"\nformat = \"pretty\"\n");
    let overlay = write_file(".toml", "[logging]\nlevel = \"warn\"\n");

    let config = ConfigLoader::new()
        .with_file(base.path())
        .unwrap()
        .with_file(overlay.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn rejects_unknown_extension() {
    let file = write_file(".yaml", "logging:\n  level: info\n");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn rejects_unknown_fields_in_files() {
    let file = write_file(".toml", "[dispatch]\ntimeout_ms = 10\n");
    assert!(ConfigLoader::new().with_file(file.path()).is_err());
}

#[test]
fn invalid_metrics_address_fails_load() {
    let file = write_file(".toml", "[metrics]\nenabled = true\naddr = \"localhost\"\n");
    let err = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn env_prefix_overrides_file() {
    let file = write_file(".toml", "[service]\nname = \"from-file\"\n");
    std::env::set_var("HERMESCFGTEST__SERVICE__NAME", "from-env");

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("hermescfgtest")
        .load()
        .unwrap();

    std::env::remove_var("HERMESCFGTEST__SERVICE__NAME");
    assert_eq!(config.service.name, "from-env");
}
