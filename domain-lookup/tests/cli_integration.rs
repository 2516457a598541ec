// domain-lookup/tests/cli_integration.rs
//
// Argument and configuration handling only; nothing here touches the
// network.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::NamedTempFile;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("domain-lookup").unwrap();
    // Keep the developer's environment out of the tests
    for var in [
        "DL_PROTOCOL",
        "DL_TIMEOUT",
        "DL_BOOTSTRAP",
        "DL_CONCURRENCY",
        "DL_JSON",
        "DL_CONFIG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper to create a temporary file with the given content
fn create_temp_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

#[test]
fn test_help_lists_flags() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--protocol"))
        .stdout(predicate::str::contains("--no-aggregators"))
        .stdout(predicate::str::contains("--raw"));
}

#[test]
fn test_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_domains_is_an_error() {
    cli()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("You must specify domain names"));
}

#[test]
fn test_invalid_concurrency_rejected() {
    cli()
        .args(["example.com", "-c", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Concurrency must be between 1 and 50"));

    cli()
        .args(["example.com", "--concurrency", "51"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_timeout_rejected() {
    cli()
        .args(["example.com", "--timeout", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timeout"));
}

#[test]
fn test_unknown_protocol_rejected() {
    cli()
        .args(["example.com", "--protocol", "gopher"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown protocol"));
}

#[test]
fn test_server_with_rdap_rejected() {
    cli()
        .args(["example.com", "--server", "whois.example.net", "--protocol", "rdap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot use --server"));
}

#[test]
fn test_missing_input_file() {
    cli()
        .args(["--file", "/nonexistent/domains.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_input_file_with_only_comments() {
    let file = create_temp_file("# nothing here\n\n   # still nothing\n");
    cli()
        .args(["--file", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No domains found"));
}

#[test]
fn test_broken_config_file_rejected() {
    let config = create_temp_file("[defaults]\nconcurrency = 0\n");
    cli()
        .args(["example.com", "--config", config.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_broken_config_file_from_env_rejected() {
    let config = create_temp_file("[defaults\nnot toml");
    cli()
        .arg("example.com")
        .env("DL_CONFIG", config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_invalid_domain_yields_error_record_offline() {
    // An invalid name never reaches the network and still produces a record
    cli()
        .args(["not a domain", "--json", "--no-aggregators"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sourceProtocol\": \"ERROR\""))
        .stdout(predicate::str::contains("\"registration\": \"indeterminate\""))
        .stdout(predicate::str::contains("\"rawData\""));
}

#[test]
fn test_json_from_environment() {
    cli()
        .arg("not a domain")
        .env("DL_JSON", "true")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["));
}
