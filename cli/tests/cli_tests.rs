use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

/// Runs `extool` inside `cwd` with an isolated home directory.
fn extool(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_extool"));
    command
        .args(args)
        .current_dir(cwd)
        .env("HOME", cwd)
        .env_remove("RUST_LOG");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("failed to run extool")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn lint_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["lint"], &[]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["positionals"][0], "lint");
    assert_eq!(json["options"]["output"], "text");
    assert_eq!(json["options"]["verbose"], false);
    assert_eq!(json["options"]["artifacts-dir"], "web-ext-artifacts");
    assert_eq!(json["sources"]["output"], "default");
}

#[test]
fn missing_sub_command_exits_with_one() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &[], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No sub-command was specified in the args"));
}

#[test]
fn unknown_command_is_reported() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["frobnicate"], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unknown command: frobnicate"));
    assert!(output.stdout.is_empty());
}

#[test]
fn invalid_choice_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["lint", "--output=xml"], &[]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.starts_with("lint: Invalid values:"), "stderr: {err}");
    assert!(output.stdout.is_empty());
}

#[test]
fn environment_fills_option() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["lint"], &[("EXTOOL_OUTPUT", "json")]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["options"]["output"], "json");
    assert_eq!(json["sources"]["output"], "environment");
}

#[test]
fn command_line_beats_environment() {
    let dir = TempDir::new().unwrap();
    let output = extool(
        dir.path(),
        &["lint", "-o", "text"],
        &[("EXTOOL_OUTPUT", "json")],
    );

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["options"]["output"], "text");
}

#[test]
fn sign_requires_credentials() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["sign"], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("sign: Missing required arguments: api-key, api-secret"));

    let output = extool(
        dir.path(),
        &["sign", "--api-key", "key", "--timeout", "10"],
        &[("EXTOOL_API_SECRET", "secret")],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["options"]["api-secret"], "secret");
    assert_eq!(json["options"]["timeout"], 10.0);
}

#[test]
fn build_reports_missing_source_with_code() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["build", "-s", "missing-dir"], &[]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.starts_with("build: cannot read source directory"), "stderr: {err}");
    assert!(err.contains("build: Error code: ENOENT"), "stderr: {err}");
}

#[test]
fn build_resolves_source_dir() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("ext")).unwrap();
    let output = extool(dir.path(), &["--source-dir", "ext", "build"], &[]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let source_dir = stdout_json(&output)["options"]["source-dir"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(Path::new(&source_dir).is_absolute());
    assert!(source_dir.ends_with("ext"));
}

#[test]
fn docs_rejects_arguments() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["docs", "extra"], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("docs: This command does not take any arguments"));
}

#[test]
fn version_and_help_succeed() {
    let dir = TempDir::new().unwrap();

    let output = extool(dir.path(), &["--version"], &[]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));

    let output = extool(dir.path(), &["--help"], &[]);
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout).into_owned();
    assert!(help.contains("lint"));
    assert!(help.contains("--source-dir"));
}

#[test]
fn discovered_config_is_applied() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("extool-config.yml"),
        "ignoreFiles:\n  - '*.log'\nlint:\n  warningsAsErrors: true\n",
    )
    .unwrap();

    let output = extool(dir.path(), &["lint"], &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["options"]["warnings-as-errors"], true);
    assert_eq!(json["options"]["ignore-files"][0], "*.log");

    let output = extool(dir.path(), &["lint", "--no-config-discovery"], &[]);
    assert_eq!(stdout_json(&output)["options"]["warnings-as-errors"], false);
}

#[test]
fn verbose_logs_version() {
    let dir = TempDir::new().unwrap();
    let output = extool(dir.path(), &["lint", "--verbose"], &[]);

    assert!(output.status.success());
    assert!(stderr(&output).contains("Version: "));
}
