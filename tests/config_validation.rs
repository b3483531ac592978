//! Integration tests for configuration validation

#![allow(clippy::expect_used)]

use packet_server::config::{Config, LoggingConfig, ServerConfig};
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = Config::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_invalid_server_address() {
    let mut config = Config::default();
    config.server.address = "invalid_address".to_string();

    let errors = config.validate();
    assert!(!errors.is_empty(), "Should have validation errors");
    assert!(errors.iter().any(|e| e.contains("Invalid server address")));
}

#[test]
fn test_empty_server_address() {
    let mut config = Config::default();
    config.server.address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_zero_read_buffer() {
    let config = ServerConfig {
        read_buffer_size: 0,
        ..ServerConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Read buffer size must be greater than 0")));
}

#[test]
fn test_max_packet_size_bounds() {
    let too_small = ServerConfig {
        max_packet_size: 2,
        ..ServerConfig::default()
    };
    assert!(too_small.validate().iter().any(|e| e.contains("too small")));

    let too_large = ServerConfig {
        max_packet_size: 70_000,
        ..ServerConfig::default()
    };
    assert!(too_large.validate().iter().any(|e| e.contains("too large")));
}

#[test]
fn test_zero_max_connections() {
    let config = ServerConfig {
        max_connections: Some(0),
        ..ServerConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Max connections must be greater than 0")));
}

#[test]
fn test_idle_timeout_too_short() {
    let config = ServerConfig {
        idle_timeout: Some(Duration::from_millis(10)),
        ..ServerConfig::default()
    };
    assert!(config.validate().iter().any(|e| e.contains("Idle timeout")));
}

#[test]
fn test_shutdown_timeout_too_long() {
    let config = ServerConfig {
        shutdown_timeout: Duration::from_secs(600),
        ..ServerConfig::default()
    };
    assert!(config.validate().iter().any(|e| e.contains("Shutdown timeout")));
}

#[test]
fn test_empty_app_name() {
    let config = LoggingConfig {
        app_name: String::new(),
        ..LoggingConfig::default()
    };
    assert!(config.validate().iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_multiple_errors_reported_together() {
    let mut config = Config::default();
    config.server.address = String::new();
    config.server.read_buffer_size = 0;
    config.logging.app_name = String::new();

    assert_eq!(config.validate().len(), 3);
    let err = config.validate_strict().expect_err("should fail");
    assert!(err.to_string().contains("Configuration validation failed"));
}

#[test]
fn test_toml_round_trip() {
    let mut config = Config::default();
    config.server.address = "0.0.0.0:30001".to_string();
    config.server.max_connections = Some(500);
    config.server.idle_timeout = Some(Duration::from_secs(90));
    config.logging.log_level = Level::DEBUG;

    let text = toml::to_string_pretty(&config).expect("serialize");
    let parsed = Config::from_toml(&text).expect("parse");

    assert_eq!(parsed.server.address, "0.0.0.0:30001");
    assert_eq!(parsed.server.max_connections, Some(500));
    assert_eq!(parsed.server.idle_timeout, Some(Duration::from_secs(90)));
    assert_eq!(parsed.logging.log_level, Level::DEBUG);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = Config::from_toml(
        r#"
        [server]
        address = "127.0.0.1:4000"
        idle_timeout = 5000
        "#,
    )
    .expect("parse");

    assert_eq!(config.server.address, "127.0.0.1:4000");
    assert_eq!(config.server.idle_timeout, Some(Duration::from_secs(5)));
    assert_eq!(config.server.max_connections, None);
    assert_eq!(config.server.read_buffer_size, 1024);
    assert_eq!(config.logging.log_level, Level::INFO);
}

#[test]
fn test_invalid_log_level_rejected() {
    let result = Config::from_toml(
        r#"
        [logging]
        log_level = "loud"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_example_config_parses() {
    let text = Config::example_config();
    let config = Config::from_toml(&text).expect("example config should parse");
    assert!(config.validate().is_empty());
}

#[test]
fn test_save_and_load_file() {
    let path = std::env::temp_dir().join(format!("packet-server-{}.toml", std::process::id()));
    let mut config = Config::default();
    config.server.max_packet_size = 4096;

    config.save_to_file(&path).expect("save");
    let loaded = Config::from_file(&path).expect("load");
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.server.max_packet_size, 4096);
}
