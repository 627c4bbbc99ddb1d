#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "callguard-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_schema_pair(dir: &Path, name: &str, request: &str, response: &str) {
    std::fs::write(dir.join(format!("{name}.request.schema.json")), request)
        .expect("request schema should be writable");
    std::fs::write(dir.join(format!("{name}.response.schema.json")), response)
        .expect("response schema should be writable");
}

fn schema_dir(tag: &str) -> PathBuf {
    let dir = unique_temp_dir(tag);
    write_schema_pair(&dir, "echo", r#"{"type":"string"}"#, r#"{"type":"string"}"#);
    write_schema_pair(
        &dir,
        "profile",
        r#"{"type":"object","properties":{"id":{"type":"integer"}},"required":["id"]}"#,
        r#"{"type":"object","properties":{"id":{"type":"integer"}},"required":["id"]}"#,
    );
    dir
}

fn callguard(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_callguard"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("callguard should run")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn check_lists_endpoints() {
    let dir = schema_dir("check");
    let output = callguard(&["check", dir.to_str().expect("utf-8 path")]);

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["endpoints"], serde_json::json!(["echo", "profile"]));
    assert_eq!(json["strict_responses"], true);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn check_rejects_half_pairs() {
    let dir = unique_temp_dir("half");
    std::fs::write(dir.join("lonely.request.schema.json"), r#"{"type":"string"}"#)
        .expect("schema should be writable");

    let output = callguard(&["check", dir.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("lonely"), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn validate_reports_issues_with_data_invalid_exit() {
    let dir = schema_dir("validate");
    let path = dir.to_str().expect("utf-8 path");

    let ok = callguard(&["validate", path, "echo", "--request", r#""hi""#]);
    assert_eq!(ok.status.code(), Some(0));
    assert_eq!(stdout_json(&ok)["valid"], true);

    let bad = callguard(&["validate", path, "echo", "--request", "42"]);
    assert_eq!(bad.status.code(), Some(60));
    let json = stdout_json(&bad);
    assert_eq!(json["valid"], false);
    assert!(!json["issues"].as_array().expect("issues array").is_empty());

    // Responses are exact-shape by default.
    let extra = callguard(&[
        "validate",
        path,
        "profile",
        "--response",
        r#"{"id":1,"secret":"x"}"#,
    ]);
    assert_eq!(extra.status.code(), Some(60));

    let unknown = callguard(&["validate", path, "nope", "--request", "1"]);
    assert_eq!(unknown.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn probe_runs_the_guarded_pipeline() {
    let dir = schema_dir("probe");
    let path = dir.to_str().expect("utf-8 path");

    let anon = callguard(&["probe", path, "echo", "--request", r#""hi""#]);
    assert_eq!(anon.status.code(), Some(50));
    let json = stdout_json(&anon);
    assert_eq!(json["error"]["code"], "unauthenticated");
    assert_eq!(json["error"]["message"], "Please Login First");

    let public = callguard(&["probe", path, "echo", "--public", "--request", r#""hi""#]);
    assert_eq!(public.status.code(), Some(0));
    assert_eq!(stdout_json(&public)["response"], "hi");

    let wrong = callguard(&["probe", path, "echo", "--uid", "u-1", "--request", "42"]);
    assert_eq!(wrong.status.code(), Some(60));
    let json = stdout_json(&wrong);
    assert_eq!(json["error"]["message"], "invalid-argument");
    assert!(json["logged"]["details"]["request_validation_error"].is_object());

    let leaky = callguard(&[
        "probe",
        path,
        "profile",
        "--public",
        "--request",
        r#"{"id":1}"#,
        "--response",
        r#"{"id":1,"secret":"x"}"#,
    ]);
    assert_eq!(leaky.status.code(), Some(125));
    let json = stdout_json(&leaky);
    assert_eq!(json["error"]["code"], "internal");
    assert!(json.get("response").is_none());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn malformed_json_argument_is_usage_error() {
    let dir = schema_dir("usage");
    let output = callguard(&[
        "probe",
        dir.to_str().expect("utf-8 path"),
        "echo",
        "--request",
        "{not json",
    ]);
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = callguard(&["version"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("callguard {}", env!("CARGO_PKG_VERSION")));
}
