//! Environment-variable configuration tests.
//!
//! Serialized because they mutate process environment.

use serial_test::serial;
use std::env;

use mcp_discovery_workflow::config::{Config, LogFormat};

fn clear_config_env() {
    for key in [
        "GENERATION_API_KEY",
        "GENERATION_BASE_URL",
        "GENERATION_MODEL",
        "STATE_PATH",
        "SESSION_TIMEOUT_HOURS",
        "LOG_LEVEL",
        "LOG_FORMAT",
        "REQUEST_TIMEOUT_MS",
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_missing_api_key_is_a_config_error() {
    clear_config_env();

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("GENERATION_API_KEY"));
}

#[test]
#[serial]
fn test_defaults_applied_when_only_key_is_set() {
    clear_config_env();
    env::set_var("GENERATION_API_KEY", "k-123");

    let config = Config::from_env().unwrap();
    assert_eq!(config.generation.api_key, "k-123");
    assert_eq!(config.generation.model, "general-v1");
    assert_eq!(config.session.timeout_hours, 72);
    assert_eq!(config.request.timeout_ms, 30000);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config
        .storage
        .state_path
        .to_string_lossy()
        .ends_with("discovery-state.json"));
}

#[test]
#[serial]
fn test_overrides_are_honored() {
    clear_config_env();
    env::set_var("GENERATION_API_KEY", "k-123");
    env::set_var("GENERATION_BASE_URL", "http://localhost:9999");
    env::set_var("STATE_PATH", "/tmp/custom-state.json");
    env::set_var("SESSION_TIMEOUT_HOURS", "12");
    env::set_var("LOG_FORMAT", "json");
    env::set_var("REQUEST_TIMEOUT_MS", "5000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.generation.base_url, "http://localhost:9999");
    assert_eq!(
        config.storage.state_path.to_string_lossy(),
        "/tmp/custom-state.json"
    );
    assert_eq!(config.session.timeout_hours, 12);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.request.timeout_ms, 5000);

    clear_config_env();
}

#[test]
#[serial]
fn test_unparsable_numbers_fall_back_to_defaults() {
    clear_config_env();
    env::set_var("GENERATION_API_KEY", "k-123");
    env::set_var("SESSION_TIMEOUT_HOURS", "not-a-number");
    env::set_var("REQUEST_TIMEOUT_MS", "soon");

    let config = Config::from_env().unwrap();
    assert_eq!(config.session.timeout_hours, 72);
    assert_eq!(config.request.timeout_ms, 30000);

    clear_config_env();
}
