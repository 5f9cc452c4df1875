//! Integration tests for the wssh CLI surface.
//!
//! Every test points `WSSH_CONFIG` and `HOME` at a temp directory so no
//! invocation can touch the real user environment.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn wssh(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wssh"));
    cmd.env("NO_COLOR", "1");
    cmd.env("HOME", home.path());
    cmd.env("WSSH_CONFIG", home.path().join(".wssh.yaml"));
    cmd
}

fn write_config(home: &TempDir, yaml: &str) {
    std::fs::write(home.path().join(".wssh.yaml"), yaml).expect("write config");
}

const BASIC_CONFIG: &str = r"
settings:
  ssh_agent_envs: {}
payloads: {}
groups:
  - name: development
    tags: [sandbox]
    hosts:
      - alias: web-dev-01
        hostname: web-01.dev.example.com
        tags: [web]
      - alias: db-dev-01
        hostname: db-01.dev.example.com
        tags: [db]
";

// --- Help and version ---

#[test]
fn no_args_shows_help_and_exits_two() {
    let home = TempDir::new().expect("tempdir");
    wssh(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SSH fleet helper"));
}

#[test]
fn help_flag_lists_commands() {
    let home = TempDir::new().expect("tempdir");
    wssh(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("capture"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn version_flag_prints_version() {
    let home = TempDir::new().expect("tempdir");
    wssh(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wssh"));
}

// --- First run ---

#[test]
fn first_run_writes_a_starter_config() {
    let home = TempDir::new().expect("tempdir");
    wssh(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("created a default configuration"));
    assert!(home.path().join(".wssh.yaml").exists());
}

// --- list ---

#[test]
fn list_shows_all_hosts() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("web-dev-01"))
        .stdout(predicate::str::contains("db-dev-01"));
}

#[test]
fn list_filters_with_and_logic() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .args(["list", "dev", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web-dev-01"))
        .stdout(predicate::str::contains("db-dev-01").not());
}

#[test]
fn list_reports_no_matches() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .args(["list", "nonexistent"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no hosts found"));
}

// --- capture syntax ---

#[test]
fn capture_rejects_missing_node_token() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .args(["capture", "jb01", "nodes", "3,4", "cap", "port", "443"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: wssh capture"));
}

#[test]
fn capture_rejects_missing_cap_token() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .args(["capture", "jb01", "node", "3,4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: wssh capture"));
}

// --- run ---

#[test]
fn run_requires_an_existing_script() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .args(["run", "missing.sh", "web-dev-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("script file does not exist"));
}

// --- push ---

#[test]
fn push_rejects_unknown_payload() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .args(["push", "dotfiles", "web-dev-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("payload alias 'dotfiles' not found"));
}

// --- history ---

#[test]
fn history_handles_missing_file() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("no connection history"));
}

#[test]
fn history_prints_recent_connections() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    std::fs::write(
        home.path().join(".wssh_history"),
        "2026-02-23T14:30:00-08:00,prod-east-01\n2026-02-24T09:15:00-08:00,dev-web-02\n",
    )
    .expect("write history");
    wssh(&home)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("02/24 09:15 | dev-web-02"))
        .stdout(predicate::str::contains("02/23 14:30 | prod-east-01"));
}

// --- auth ---

#[test]
fn auth_requires_agent_envs() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, BASIC_CONFIG);
    wssh(&home)
        .arg("auth")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no ssh_agent_envs found"));
}

#[test]
fn auth_rejects_missing_check_key() {
    let home = TempDir::new().expect("tempdir");
    write_config(
        &home,
        r"
settings:
  ssh_agent_envs:
    default:
      sock: /tmp/wssh-test-agent.sock
      key: ~/.ssh/does-not-exist
groups: []
",
    );
    wssh(&home)
        .arg("auth")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find key"));
}

// --- config errors ---

#[test]
fn broken_config_is_a_parse_error() {
    let home = TempDir::new().expect("tempdir");
    write_config(&home, "settings: [not, a, mapping]");
    wssh(&home)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse"));
}
