//! Integration tests for configuration loading.

use std::io::Write;

use livetally::config::Config;
use livetally::error::ConfigError;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_valid_config() {
    let file = write_config(
        r#"
        [backend]
        rest_url = "https://example.supabase.co"
        realtime_url = "wss://example.supabase.co/realtime/v1"
        api_key = "anon-key"

        [sync]
        table = "patients"
        filter_column = "therapist_id"
        filter_value = "7"
        grace_period_secs = 2
        poll_interval_secs = 15
        "#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.sync.table, "patients");
    assert_eq!(config.sync.grace_period_secs, 2);
    assert_eq!(config.sync.poll_interval_secs, 15);
    let filter = config.filter().unwrap();
    assert_eq!(filter.realtime_expr(), "therapist_id=eq.7");
}

#[test]
fn test_load_applies_interval_defaults() {
    let file = write_config(
        r#"
        [backend]
        rest_url = "https://example.supabase.co"
        realtime_url = "wss://example.supabase.co/realtime/v1"
        api_key = "anon-key"

        [sync]
        table = "patients"
        "#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.sync.grace_period_secs, 3);
    assert_eq!(config.sync.poll_interval_secs, 10);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_missing_file() {
    let err = Config::load("/nonexistent/livetally.toml").unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile(_)));
}

#[test]
fn test_load_malformed_toml() {
    let file = write_config("[backend\nrest_url = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_load_rejects_missing_table() {
    let file = write_config(
        r#"
        [backend]
        rest_url = "https://example.supabase.co"
        realtime_url = "wss://example.supabase.co/realtime/v1"
        api_key = "anon-key"

        [sync]
        table = ""
        "#,
    );

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MissingField { field: "sync.table" }
    ));
}
