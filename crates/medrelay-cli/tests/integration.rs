use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn medrelay(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("medrelay").unwrap();
    cmd.current_dir(dir.path())
        .env("MEDRELAY_DB", dir.path().join("medrelay.db"));
    cmd
}

fn sample_data_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../sample_data")
}

fn load_sample_data(dir: &TempDir) {
    medrelay(dir)
        .args(["load", "--data-dir"])
        .arg(sample_data_dir())
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

#[test]
fn migrate_creates_the_database_file() {
    let dir = TempDir::new().unwrap();
    medrelay(&dir).arg("migrate").assert().success();
    assert!(dir.path().join("medrelay.db").exists());
}

#[test]
fn migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();
    medrelay(&dir).arg("migrate").assert().success();
    medrelay(&dir).arg("migrate").assert().success();
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

#[test]
fn load_reports_the_data_directory() {
    let dir = TempDir::new().unwrap();
    medrelay(&dir)
        .args(["load", "--data-dir"])
        .arg(sample_data_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("loaded data from"));
}

#[test]
fn load_fails_on_an_empty_data_directory() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();
    medrelay(&dir)
        .args(["load", "--data-dir"])
        .arg(&empty)
        .assert()
        .failure()
        .stderr(predicate::str::contains("physicians.csv"));
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

#[test]
fn classify_prints_matched_rules_as_json() {
    let dir = TempDir::new().unwrap();
    load_sample_data(&dir);

    let output = medrelay(&dir)
        .args(["classify", "10013"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(json["message_id"], 10013);
    assert_eq!(json["compliance_version"], "v1");
    let rules = json["matched_rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["id"], "R-004");
    assert_eq!(rules[0]["result_type"], "requires_append");
    assert_eq!(rules[0]["matched_keywords"], serde_json::json!(["samples"]));
}

#[test]
fn classify_unknown_message_fails_with_not_found() {
    let dir = TempDir::new().unwrap();
    load_sample_data(&dir);

    medrelay(&dir)
        .args(["classify", "999999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Message not found"));
}

#[test]
fn classify_unknown_version_yields_empty_matches() {
    let dir = TempDir::new().unwrap();
    load_sample_data(&dir);

    let output = medrelay(&dir)
        .args(["classify", "10013", "--version", "v99"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["compliance_version"], "v99");
    assert_eq!(json["matched_rules"], serde_json::json!([]));
}

#[test]
fn classify_off_label_message_fires_the_escalation_rule() {
    let dir = TempDir::new().unwrap();
    load_sample_data(&dir);

    let output = medrelay(&dir)
        .args(["classify", "10042"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let rules = json["matched_rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["id"], "R-001");
    assert_eq!(rules[0]["result_type"], "action");
    assert_eq!(
        rules[0]["matched_keywords"],
        serde_json::json!(["off-label"])
    );
}
