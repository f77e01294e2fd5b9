#![allow(deprecated)]
//! Integration tests for the sc-sandbox binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ADDR: &str = "AG4GfwjnvydAZodm4xEDivguCtjCFzLcJy";

fn sandbox_cmd() -> Command {
    let mut cmd = Command::cargo_bin("sc-sandbox").expect("binary not found");
    cmd.env_remove("SC_SANDBOX_WALLET")
        .env_remove("SC_SANDBOX_FREE_GAS")
        .env_remove("SC_SANDBOX_MAX_STEPS")
        .env_remove("RUST_LOG");
    cmd
}

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixture")
}

fn wallet_path() -> PathBuf {
    fixture_dir().join("wallet.json")
}

fn scratch() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("SampleSC.py");
    fs::copy(fixture_dir().join("SampleSC.py"), &source).unwrap();
    (dir, source)
}

#[test]
fn test_sc_without_subcommand_fails() {
    sandbox_cmd()
        .arg("sc")
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "run `sc help` to see supported queries",
        ));
}

#[test]
fn test_sc_help() {
    sandbox_cmd()
        .args(["sc", "help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sc build_run"));
}

#[test]
fn test_build() {
    let (dir, source) = scratch();
    sandbox_cmd()
        .args(["sc", "build"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved output to"))
        .stdout(predicate::str::contains("SampleSC.avm"));
    assert!(dir.path().join("SampleSC.avm").exists());
    assert!(dir.path().join("SampleSC.debug.json").exists());
}

#[test]
fn test_build_run_with_wallet_flag() {
    let (_dir, source) = scratch();
    sandbox_cmd()
        .arg("--wallet")
        .arg(wallet_path())
        .args(["sc", "build_run"])
        .arg(&source)
        .args(["True", "False", "False", "070502", "02", "add", ADDR, "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test deploy invoke successful"))
        .stdout(predicate::str::contains("Results: [3]"));
}

#[test]
fn test_build_run_with_wallet_from_env() {
    let (_dir, source) = scratch();
    sandbox_cmd()
        .env("SC_SANDBOX_WALLET", wallet_path())
        .args(["sc", "build_run"])
        .arg(&source)
        .args(["True", "True", "False", "0", "0", "balance", ADDR, "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test deploy invoke successful"));
}

#[test]
fn test_build_run_without_wallet_fails() {
    let (_dir, source) = scratch();
    sandbox_cmd()
        .args(["sc", "build_run"])
        .arg(&source)
        .args(["True", "True", "False", "0", "0", "add", ADDR, "3"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Please open a wallet to test build contract",
        ));
}

#[test]
fn test_interactive_arguments_from_stdin() {
    let (_dir, source) = scratch();
    sandbox_cmd()
        .arg("--wallet")
        .arg(wallet_path())
        .args(["sc", "build_run"])
        .arg(&source)
        .args(["True", "True", "False", "0", "0", "--i"])
        .write_stdin(format!("add\n{}\n5\n", ADDR))
        .assert()
        .success()
        .stdout(predicate::str::contains("[operation] > "))
        .stdout(predicate::str::contains("Results: [5]"));
}

#[test]
fn test_json_summary() {
    let (_dir, source) = scratch();
    let output = sandbox_cmd()
        .arg("--json")
        .arg("--wallet")
        .arg(wallet_path())
        .args(["sc", "build_run"])
        .arg(&source)
        .args(["True", "True", "False", "0", "0", "add", ADDR, "3"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(json["success"], true);
    let invocation = &json["invocation"];
    assert_eq!(invocation["state"], "HALT");
    assert_eq!(invocation["results"][0]["type"], "Integer");
    assert_eq!(invocation["results"][0]["value"], "3");
    assert!(invocation["tx_hash"].as_str().unwrap().starts_with("0x"));

    // human-readable lines move to stderr
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Test deploy invoke successful"));
}

#[test]
fn test_json_summary_for_failure() {
    let output = sandbox_cmd()
        .args(["--json", "sc", "badcommand"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "usage");
    assert_eq!(json["error"]["message"], "badcommand is an invalid parameter");
}

#[test]
fn test_max_steps_limit() {
    let (_dir, source) = scratch();
    sandbox_cmd()
        .args(["--max-steps", "5", "--wallet"])
        .arg(wallet_path())
        .args(["sc", "build_run"])
        .arg(&source)
        .args(["True", "True", "False", "0", "0", "add", ADDR, "3"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Test invoke failed"))
        .stdout(predicate::str::contains("step limit"));
}

#[test]
fn test_missing_wallet_file_is_an_error() {
    sandbox_cmd()
        .args(["--wallet", "/nonexistent/wallet.json", "sc", "help"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open wallet"));
}

#[test]
fn test_shell_session() {
    let (_dir, source) = scratch();
    let script = format!(
        "sc build_run {src} True True False 0 0 add {addr} 3\n\
         open wallet {wallet}\n\
         sc build_run {src} True True False 0 0 --i\n\
         remove\n{addr}\n3\n\
         close wallet\n\
         exit\n",
        src = source.display(),
        addr = ADDR,
        wallet = wallet_path().display()
    );
    sandbox_cmd()
        .arg("shell")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Please open a wallet to test build contract",
        ))
        .stdout(predicate::str::contains("Opened wallet wallet_1"))
        .stdout(predicate::str::contains("Results: [0]"))
        .stdout(predicate::str::contains("Wallet closed"));
}
