use assert_cmd::Command;
use predicates::prelude::*;

fn cli_cmd() -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("greentic-keyring");
    cmd.env_remove("GREENTIC_KEYRING_PREFIX")
        .env("GREENTIC_AWS_REGION", "us-east-1")
        .env("GREENTIC_AWS_SM_ENDPOINT", "http://127.0.0.1:9")
        .env("AWS_ACCESS_KEY_ID", "test")
        .env("AWS_SECRET_ACCESS_KEY", "test")
        .env("AWS_MAX_ATTEMPTS", "1")
        .env_remove("AWS_PROFILE");
    cmd
}

#[test]
fn help_works() {
    cli_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Greentic data-protection keyring CLI"));
}

#[test]
fn prefix_is_required() {
    cli_cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GREENTIC_KEYRING_PREFIX"));
}

#[test]
fn store_rejects_malformed_documents() {
    cli_cmd()
        .args(["--prefix", "app", "store", "--file", "-"])
        .write_stdin("<key><unterminated></key>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input is not a key document"));
}

#[test]
fn list_reports_unreachable_store() {
    cli_cmd()
        .args(["--prefix", "app", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load keyring"));
}
