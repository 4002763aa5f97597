//! CLI surface tests for the `livetally` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn livetally() -> Command {
    Command::cargo_bin("livetally").unwrap()
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID: &str = r#"
[backend]
rest_url = "https://example.supabase.co"
realtime_url = "wss://example.supabase.co/realtime/v1"
api_key = "anon-key"

[sync]
table = "patients"
"#;

#[test]
fn test_help_lists_commands() {
    livetally()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("count"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_check_config_accepts_valid_file() {
    let file = write_config(VALID);
    livetally()
        .args(["check", "config", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("patients"));
}

#[test]
fn test_check_config_reports_missing_file() {
    livetally()
        .args(["check", "config", "--config", "/nonexistent/livetally.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn test_check_config_reports_invalid_realtime_url() {
    let file = write_config(
        r#"
        [backend]
        rest_url = "https://example.supabase.co"
        realtime_url = "https://not-a-websocket"
        api_key = "anon-key"

        [sync]
        table = "patients"
        "#,
    );
    livetally()
        .args(["check", "config", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("backend.realtime_url"));
}

#[test]
fn test_api_key_falls_back_to_environment() {
    let file = write_config(
        r#"
        [backend]
        rest_url = "https://example.supabase.co"
        realtime_url = "wss://example.supabase.co/realtime/v1"

        [sync]
        table = "patients"
        "#,
    );
    livetally()
        .env("LIVETALLY_API_KEY", "env-key")
        .args(["check", "config", "--config"])
        .arg(file.path())
        .assert()
        .success();

    livetally()
        .env_remove("LIVETALLY_API_KEY")
        .args(["check", "config", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("backend.api_key"));
}

#[test]
fn test_unknown_subcommand_fails() {
    livetally().arg("frobnicate").assert().failure();
}
