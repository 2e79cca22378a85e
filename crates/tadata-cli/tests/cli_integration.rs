//! CLI subprocess integration tests.
//!
//! These tests invoke the `tadata` binary as a subprocess against an
//! in-process stub of the deployment API and verify exit codes, stdout
//! content, and JSON output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tadata_stub::{Stub, TestServer};

const KEY: &str = "cli-key";

/// `HOME` points into `home` so stored credentials never leak between tests.
fn tadata_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tadata"));
    cmd.env("HOME", home)
        .env_remove("TADATA_API_KEY")
        .env_remove("TADATA_LOG");
    cmd
}

fn write_spec(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn petstore(dir: &Path) -> PathBuf {
    write_spec(
        dir,
        "petstore.yaml",
        "openapi: 3.0.3\ninfo:\n  title: Petstore\n  version: 1.0.0\npaths:\n  /pets:\n    get:\n      responses:\n        200:\n          description: ok\n",
    )
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = tadata_bin(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success(), "tadata --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tadata"), "version output: {stdout}");
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = tadata_bin(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["deploy", "validate", "configure", "completions"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = tadata_bin(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!output.stdout.is_empty());
}

#[test]
fn cli_validate_json_output() {
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());
    let output = tadata_bin(home.path())
        .args(["--json", "validate"])
        .arg(&spec)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["title"], "Petstore");
    assert_eq!(json["openapi"], "3.0.3");
    assert_eq!(json["paths"], 1);
}

#[test]
fn cli_validate_swagger_2_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let spec = write_spec(
        home.path(),
        "swagger.json",
        r#"{"openapi": "2.0", "info": {"title": "T", "version": "1"}, "paths": {}}"#,
    );
    let output = tadata_bin(home.path())
        .args(["--json", "validate"])
        .arg(&spec)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], "spec_invalid");
}

#[test]
fn cli_deploy_file_json() {
    let server = TestServer::start(Stub::new([KEY]));
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());

    let output = tadata_bin(home.path())
        .args(["--json", "deploy", "--file"])
        .arg(&spec)
        .args(["--api-key", KEY, "--service-url", server.url.as_str(), "--name", "pets"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["updated"], false);
    assert!(json["id"].as_str().unwrap().starts_with("dep_"));

    let requests = server.stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body.as_ref().unwrap()["name"], "pets");
}

#[test]
fn cli_deploy_url_human_output() {
    let server = TestServer::start(Stub::new([KEY]));
    server.stub.add_document(
        "openapi.json",
        "application/json",
        r#"{"openapi": "3.1.0", "info": {"title": "T", "version": "1"}, "paths": {}}"#,
    );
    let home = tempfile::tempdir().unwrap();

    let output = tadata_bin(home.path())
        .args(["deploy", "--url", server.document_url("openapi.json").as_str()])
        .args(["--service-url", server.url.as_str()])
        .env("TADATA_API_KEY", KEY)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("deployment dep_"), "stdout: {stdout}");
}

#[test]
fn cli_deploy_passes_auth_config() {
    let server = TestServer::start(Stub::new([KEY]));
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());

    let output = tadata_bin(home.path())
        .args(["--json", "deploy", "--file"])
        .arg(&spec)
        .args(["--api-key", KEY, "--service-url", server.url.as_str()])
        .args(["--pass-header", "x-tenant", "--pass-form-data-param", "token"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let requests = server.stub.requests();
    let auth = &requests[0].body.as_ref().unwrap()["authConfig"];
    assert_eq!(auth["passHeaders"], serde_json::json!(["x-tenant"]));
    assert_eq!(auth["passFormDataParams"], serde_json::json!(["token"]));
    assert_eq!(
        auth["passQueryParams"],
        serde_json::json!(["api-key", "api_key", "apikey"])
    );
}

#[test]
fn cli_configure_then_deploy_uses_stored_credentials() {
    let server = TestServer::start(Stub::new([KEY]));
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());

    let output = tadata_bin(home.path())
        .args(["configure", "--api-key", KEY, "--service-url", server.url.as_str()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(home.path().join(".config/tadata/credentials.json").exists());

    let output = tadata_bin(home.path())
        .args(["--json", "deploy", "--file"])
        .arg(&spec)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        server.stub.requests()[0].query.get("apiKey").map(String::as_str),
        Some(KEY)
    );
}

#[test]
fn cli_deploy_wrong_key_exits_3() {
    let server = TestServer::start(Stub::new([KEY]));
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());

    let output = tadata_bin(home.path())
        .args(["--json", "deploy", "--file"])
        .arg(&spec)
        .args(["--api-key", "wrong", "--service-url", server.url.as_str()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], "auth_error");
    assert_eq!(json["error"]["status"], 401);
}

#[test]
fn cli_deploy_unreachable_service_exits_4() {
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());

    let output = tadata_bin(home.path())
        .args(["--json", "deploy", "--file"])
        .arg(&spec)
        .args(["--api-key", KEY, "--service-url", "http://127.0.0.1:1"])
        .args(["--timeout", "2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(stdout_json(&output)["error"]["code"], "network_error");
}

#[test]
fn cli_deploy_without_source_exits_1() {
    let home = tempfile::tempdir().unwrap();
    let output = tadata_bin(home.path())
        .args(["--json", "deploy", "--api-key", KEY])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["error"]["code"], "invalid_argument");
}

#[test]
fn cli_deploy_with_two_sources_exits_1() {
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());
    let output = tadata_bin(home.path())
        .args(["--json", "deploy", "--file"])
        .arg(&spec)
        .args(["--url", "http://127.0.0.1:1/openapi.json", "--api-key", KEY])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_deploy_without_api_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let spec = petstore(home.path());
    let output = tadata_bin(home.path())
        .args(["deploy", "--file"])
        .arg(&spec)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no API key"), "stderr: {stderr}");
}
