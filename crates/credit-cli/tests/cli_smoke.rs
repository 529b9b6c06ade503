//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `credit` binary to verify that
//! argument parsing, help text, and error handling work end-to-end.

use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("credit").unwrap()
}

/// Index column, target and the ten feature columns.
fn write_credit_csv(path: &Path, rows: usize, label: impl Fn(usize) -> u8) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(
        file,
        ",target,util,age,late30,debt,income,lines,late90,estate,late60,deps"
    )
    .unwrap();
    for i in 0..rows {
        let t = label(i);
        writeln!(
            file,
            "{},{},{:.3},{},{},{:.3},{},{},{},{},{},{}",
            i,
            t,
            0.1 + 0.8 * t as f64 + (i % 7) as f64 * 0.01,
            25 + (i % 40),
            (i % 3) * t as usize,
            0.2 + (i % 11) as f64 * 0.05,
            3000 + (i % 13) * 250,
            2 + i % 9,
            t,
            i % 4,
            i % 2,
            i % 3
        )
        .unwrap();
    }
}

fn write_config(path: &Path, body: &str) -> PathBuf {
    std::fs::write(path, body).unwrap();
    path.to_path_buf()
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("best-model"))
        .stdout(predicate::str::contains("monitor"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("credit"));
}

#[test]
fn unknown_subcommand_errors() {
    cmd().arg("rescore").assert().failure();
}

#[test]
fn missing_config_file_errors() {
    cmd()
        .args(["ping", "--config", "/nonexistent/config.yaml"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_nonexistent_file_errors() {
    cmd()
        .args(["validate", "/nonexistent/train.csv"])
        .assert()
        .failure();
}

#[test]
fn validate_rejects_other_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.parquet");
    std::fs::File::create(&path).unwrap();
    cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn validate_accepts_rows_labelled_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.csv");
    write_credit_csv(&path, 10, |_| 1);
    cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn validate_rejects_label_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.csv");
    write_credit_csv(&path, 10, |i| (i % 2) as u8);
    cmd().arg("validate").arg(&path).assert().failure();
}

// ---------------------------------------------------------------------------
// train / predict / monitor
// ---------------------------------------------------------------------------

#[test]
fn train_writes_model_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("train.csv");
    write_credit_csv(&data, 80, |i| (i % 2) as u8);
    let models = dir.path().join("models");
    let config = write_config(
        &dir.path().join("config.json"),
        &format!(
            r#"{{"model_name": "clf.json", "models_dir": {:?}, "test_size": 0.25}}"#,
            models.display().to_string()
        ),
    );

    cmd()
        .arg("train")
        .arg(&data)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("roc_auc"));
    assert!(models.join("clf.json").exists());
}

#[test]
fn predict_requires_data() {
    cmd().arg("predict").assert().failure();
}

#[test]
fn predict_against_unreachable_endpoint_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("test.csv");
    write_credit_csv(&data, 5, |_| 0);
    let db = dir.path().join("preds.db");
    let config = write_config(
        &dir.path().join("config.json"),
        &format!(
            r#"{{"scoring_endpoint": "http://127.0.0.1:9/invocations", "predictions_db": {:?}, "request_timeout_secs": 2}}"#,
            db.display().to_string()
        ),
    );

    cmd()
        .args(["predict", "-c"])
        .arg(&config)
        .arg(&data)
        .assert()
        .failure();
    assert!(!db.exists());
}

#[test]
fn monitor_without_reference_errors() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir.path().join("config.yaml"),
        &format!("predictions_db: {}\n", dir.path().join("preds.db").display()),
    );
    cmd()
        .args(["monitor", "--config"])
        .arg(&config)
        .assert()
        .failure();
}
