//! E2E tests for `config`, `auth` and `completions`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn parley(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("parley"));
    cmd.current_dir(dir);
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env("HOME", dir);
    cmd.env_remove("FORMAT");
    cmd.env_remove("PARLEY_WEBLATE_TOKEN");
    cmd.env("PARLEY_LOG", "error");
    cmd
}

fn effective(dir: &Path) -> Value {
    let output = parley(dir)
        .args(["config", "show", "--format", "json"])
        .output()
        .expect("config show runs");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

#[test]
fn defaults_without_any_file() {
    let dir = TempDir::new().expect("tempdir");
    let config = effective(dir.path());
    assert_eq!(config["display"]["enable_translation"], false);
    assert_eq!(config["weblate"]["project"], "dai");
    assert_eq!(config["weblate"]["language"], "ko");
    assert_eq!(config["resolved_output"], "json");
}

#[test]
fn set_persists_to_project_file() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["config", "set", "display.show_source_alongside_translation", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show_source_alongside_translation"));

    let written = std::fs::read_to_string(dir.path().join(".parley/config.toml"))
        .expect("project config written");
    assert!(written.contains("show_source_alongside_translation = true"));
    assert_eq!(
        effective(dir.path())["display"]["show_source_alongside_translation"],
        true
    );

    parley(dir.path())
        .args(["config", "unset", "display.show_source_alongside_translation"])
        .assert()
        .success();
    assert_eq!(
        effective(dir.path())["display"]["show_source_alongside_translation"],
        false
    );
}

#[test]
fn project_overrides_user_scope() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["config", "set", "--scope", "user", "weblate.language", "de"])
        .assert()
        .success();
    assert_eq!(effective(dir.path())["weblate"]["language"], "de");

    parley(dir.path())
        .args(["config", "set", "weblate.language", "fr"])
        .assert()
        .success();
    assert_eq!(effective(dir.path())["weblate"]["language"], "fr");
}

#[test]
fn user_output_mode_applies_without_flag() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["config", "set", "--scope", "user", "user.output", "json"])
        .assert()
        .success();
    let output = parley(dir.path())
        .args(["config", "show"])
        .output()
        .expect("runs");
    let value: Value = serde_json::from_slice(&output.stdout).expect("json by config");
    assert_eq!(value["resolved_output"], "json");
}

#[test]
fn token_is_redacted_in_show() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["config", "set", "--scope", "user", "weblate.token", "s3cret"])
        .assert()
        .success();
    parley(dir.path())
        .args(["config", "show", "--user", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s3cret").not());
    assert_eq!(effective(dir.path())["weblate"]["token"], "********");
}

#[test]
fn env_token_counts_as_configured() {
    let dir = TempDir::new().expect("tempdir");
    let output = parley(dir.path())
        .env("PARLEY_WEBLATE_TOKEN", "abc")
        .args(["config", "show", "--format", "json"])
        .output()
        .expect("runs");
    let value: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["weblate"]["token"], "********");
}

#[test]
fn unsupported_key_fails() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["config", "set", "weblate.token", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported key"));
}

#[test]
fn auth_requires_base_url() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["auth", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4001"));
}

#[test]
fn auth_reports_missing_token() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["config", "set", "weblate.base_url", "http://127.0.0.1:9"])
        .assert()
        .success();
    parley(dir.path())
        .args(["auth", "--format", "text"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("no API token configured"))
        .stderr(predicate::str::contains("E4002"));
}

#[test]
fn completions_name_the_binary() {
    let dir = TempDir::new().expect("tempdir");
    parley(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parley"));
}
