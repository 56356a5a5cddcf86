//! Smoke tests for command wiring

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn wikidb() -> Command {
    let mut cmd = Command::cargo_bin("wikidb").unwrap();
    // Keep the host environment out of config loading
    for key in [
        "WIKIDB_CONFIG",
        "WIKIDB_JDBC_URL",
        "WIKIDB_JDBC_DRIVER",
        "WIKIDB_MAX_POOL_SIZE",
        "WIKIDB_QUEUE",
        "WIKIDB_SQL_QUERIES_FILE",
        "WIKIDB_INSTANCES",
        "WIKIDB_ACQUIRE_TIMEOUT_SECS",
        "WIKIDB_REQUEST_TIMEOUT_SECS",
        "WIKIDB_BIND",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn db_url(dir: &TempDir) -> String {
    format!("jdbc:sqlite:{}", dir.path().join("data").join("wiki.db").display())
}

#[test]
fn test_top_level_help() {
    wikidb()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("dump"));
}

#[test]
fn test_serve_help() {
    wikidb()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"));
}

#[test]
fn test_pages_on_fresh_database_is_empty() {
    let dir = TempDir::new().unwrap();
    wikidb()
        .args(["pages", "--json", "--jdbc-url", &db_url(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));

    // Parent directory and schema were created on the way
    assert!(dir.path().join("data").join("wiki.db").exists());
}

#[test]
fn test_dump_on_fresh_database() {
    let dir = TempDir::new().unwrap();
    wikidb()
        .args(["dump", "--compact", "--jdbc-url", &db_url(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_unsupported_driver_fails() {
    let dir = TempDir::new().unwrap();
    wikidb()
        .env("WIKIDB_JDBC_DRIVER", "org.postgresql.Driver")
        .args(["pages", "--jdbc-url", &db_url(&dir)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn test_flag_overrides_invalid_env_value() {
    let dir = TempDir::new().unwrap();
    wikidb()
        .env("WIKIDB_MAX_POOL_SIZE", "0")
        .args(["pages", "--max-pool-size", "4", "--jdbc-url", &db_url(&dir)])
        .assert()
        .success();
}

#[test]
fn test_invalid_env_value_without_flag_fails() {
    let dir = TempDir::new().unwrap();
    wikidb()
        .env("WIKIDB_MAX_POOL_SIZE", "0")
        .args(["pages", "--jdbc-url", &db_url(&dir)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid wikidb configuration"));
}
