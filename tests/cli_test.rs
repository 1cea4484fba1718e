use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn qtap() -> Command {
    let mut cmd = Command::new(cargo_bin!("qtap"));
    cmd.env_remove("QTAP_TOKEN")
        .env_remove("QTAP_ROLE")
        .env_remove("QTAP_DB_PATH")
        .env("QTAP_API_URL", "http://127.0.0.1:9/api");
    cmd
}

#[test]
fn test_fund_rejects_non_positive_amount() {
    qtap()
        .args(["fund", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Amount must be positive"));
}

#[test]
fn test_fund_rejects_garbage_amount() {
    qtap()
        .args(["fund", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please enter a valid amount"));
}

#[test]
fn test_fund_without_session_requires_login() {
    qtap()
        .args(["fund", "1500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[error] Please login to continue"))
        .stdout(predicate::str::contains("navigate: /login"));
}

#[test]
fn test_cancelled_callback() {
    qtap()
        .args(["callback", "status=cancelled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status: Cancelled"));
}

#[test]
fn test_callback_without_reference() {
    qtap()
        .args(["callback", "https://qtap.app/funding/callback?status=successful"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status: Failed (MissingReference)"));
}

#[test]
fn test_callback_without_session_is_session_expired() {
    qtap()
        .args([
            "callback",
            "https://qtap.app/funding/callback?status=successful&tx_ref=ABC123",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("tx_ref: ABC123"))
        .stdout(predicate::str::contains("status: Failed (session expired)"))
        .stdout(predicate::str::contains("navigate: /login"));
}

#[test]
fn test_pay_rejects_blank_code() {
    qtap()
        .args(["pay", "--code", "   "])
        .assert()
        .failure();
}

#[test]
fn test_invalid_api_url_is_configuration_error() {
    qtap()
        .args(["--api-url", "not a url", "callback", "status=cancelled"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_log_directives_are_accepted() {
    qtap()
        .env("RUST_LOG", "qtap=debug,reqwest=warn")
        .args(["callback", "status=cancelled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status: Cancelled"));
}

#[test]
fn test_invalid_log_directive_is_configuration_error() {
    qtap()
        .env("RUST_LOG", "qtap=chatty")
        .args(["callback", "status=cancelled"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RUST_LOG"));
}
