//! Integration tests for the `camcheck` CLI binary.
//!
//! Argument parsing, config management and the query API commands against a
//! wiremock device. Nothing here needs a browser or a real camera.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/cgi-bin/webSetup.cgi";

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `camcheck` binary with env isolation.
///
/// Clears all `CAMCHECK_*` env vars and points the config file into
/// `config_dir`, so tests never touch the user's real configuration.
fn camcheck_cmd(config_dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("camcheck");
    cmd.env("CAMCHECK_CONFIG", config_dir.join("config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("CAMCHECK_PROFILE")
        .env_remove("CAMCHECK_DEVICE")
        .env_remove("CAMCHECK_USERNAME")
        .env_remove("CAMCHECK_PASSWORD")
        .env_remove("CAMCHECK_OUTPUT")
        .env_remove("CAMCHECK_INSECURE")
        .env_remove("CAMCHECK_TIMEOUT")
        .env_remove("CAMCHECK_RETRIES")
        .env_remove("CAMCHECK_WEBDRIVER")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

async fn device() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    camcheck_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("roundtrip")
            .and(predicate::str::contains("export"))
            .and(predicate::str::contains("import")),
    );
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    camcheck_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("camcheck"));
}

#[test]
fn test_completions_zsh() {
    let dir = TempDir::new().unwrap();
    camcheck_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_subcommand() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path()).arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_set_requires_key_value_pairs() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path())
        .args(["-d", "http://127.0.0.1:1", "set", "systemInfo", "note"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("KEY=VALUE"));
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_get_without_device_explains_setup() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path())
        .args(["get", "systemInfo"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("No device configured"), "{text}");
    assert!(text.contains("config init"), "{text}");
}

#[test]
fn test_config_path_honours_env() {
    let dir = TempDir::new().unwrap();
    camcheck_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_profiles_empty() {
    let dir = TempDir::new().unwrap();
    camcheck_cmd(dir.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No profiles configured"));
}

#[test]
fn test_config_set_then_show_redacts_password() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "default_profile = \"lab\"\n\n[profiles.lab]\ndevice = \"http://10.0.0.5\"\npassword = \"hunter2\"\n",
    )
    .unwrap();

    camcheck_cmd(dir.path())
        .args(["config", "set", "retry_attempts", "4"])
        .assert()
        .success();

    let output = camcheck_cmd(dir.path())
        .args(["config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("http://10.0.0.5"), "{text}");
    assert!(text.contains("retry_attempts = 4"), "{text}");
    assert!(!text.contains("hunter2"), "password leaked:\n{text}");

    let json = camcheck_cmd(dir.path())
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(!String::from_utf8_lossy(&json.stdout).contains("hunter2"));
}

#[test]
fn test_config_set_unknown_key_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path())
        .args(["config", "set", "colour", "red"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown config key"));
}

#[test]
fn test_config_use_missing_profile() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path())
        .args(["config", "use", "nowhere"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("not found"));
}

// ── Query API against a mock device ─────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_get_prints_json_record() {
    let server = device().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("action", "systemInfo"))
        .and(query_param("mode", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("note=factory&model=WV-X"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = camcheck_cmd(dir.path());
    cmd.args(["-d", &server.uri(), "-o", "json-compact", "get", "systemInfo"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), r#"{"note":"factory","model":"WV-X"}"#);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_single_field_plain() {
    let server = device().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("note=factory&model=WV-X"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = camcheck_cmd(dir.path());
    cmd.args(["-d", &server.uri(), "-o", "plain", "get", "systemInfo", "-f", "note"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "factory\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_missing_field_fails() {
    let server = device().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("model=WV-X"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = camcheck_cmd(dir.path());
    cmd.args(["-d", &server.uri(), "get", "systemInfo", "--field", "note"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("not present"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_rejected_by_device() {
    let server = device().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("returnCode=-1"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = camcheck_cmd(dir.path());
    cmd.args(["-d", &server.uri(), "set", "systemInfo", "note=x"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("returnCode=-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_reports_outcome() {
    let server = device().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("returnCode=0"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = camcheck_cmd(dir.path());
    cmd.args(["-d", &server.uri(), "-o", "plain", "set", "systemInfo", "note=x"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("outcome=applied"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_maps_to_auth_exit_code() {
    let server = device().await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = camcheck_cmd(dir.path());
    cmd.env("CAMCHECK_PASSWORD", "wrong").args([
        "-d",
        &server.uri(),
        "-u",
        "admin",
        "--retries",
        "1",
        "get",
        "systemInfo",
    ]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Authentication failed"));
}

// ── UI commands that fail before a browser is needed ────────────────

#[test]
fn test_import_missing_file_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path())
        .args(["-d", "http://127.0.0.1:1", "--yes", "import"])
        .arg(dir.path().join("absent.bin"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("not a readable file"));
}

#[test]
fn test_import_without_tty_requires_yes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("settings.bin");
    std::fs::write(&file, b"\x01\x02").unwrap();

    let output = camcheck_cmd(dir.path())
        .args(["-d", "http://127.0.0.1:1", "import"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_export_without_webdriver_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let output = camcheck_cmd(dir.path())
        .args([
            "-d",
            "http://127.0.0.1:1",
            "--webdriver",
            "http://127.0.0.1:1",
            "export",
            "--out",
        ])
        .arg(dir.path().join("out.bin"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("WebDriver"));
}
