//! CLI argument parsing tests for Chameleon

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn chameleon() -> Command {
    Command::new(env!("CARGO_BIN_EXE_chameleon"))
}

#[test]
fn test_help_flag() {
    chameleon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("autonomous SRE agent"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version_flag() {
    chameleon()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_usage() {
    chameleon()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_every_subcommand_is_listed() {
    let output = chameleon().arg("--help").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["init", "ask", "chat", "ingest", "search", "status"] {
        assert!(stdout.contains(name), "missing {} in help:\n{}", name, stdout);
    }
}

#[test]
fn test_ask_help() {
    chameleon()
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Run the agent once"))
        .stdout(predicate::str::contains("-n, --namespace"))
        .stdout(predicate::str::contains("<QUERY>"));
}

#[test]
fn test_ask_requires_query() {
    chameleon()
        .arg("ask")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<QUERY>"));
}

#[test]
fn test_ingest_help() {
    chameleon()
        .args(["ingest", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--reset"));
}

#[test]
fn test_search_help() {
    chameleon()
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-k, --top-k"));
}

#[test]
fn test_search_rejects_non_numeric_top_k() {
    chameleon()
        .args(["search", "OOMKilled", "--top-k", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_unknown_subcommand() {
    chameleon()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
