use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("leadflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Inbound webhook reconciliation"));
}

#[test]
fn test_cli_serve_help() {
    let mut cmd = Command::cargo_bin("leadflow").unwrap();
    cmd.arg("serve").arg("--help").assert().success().stdout(predicate::str::contains("port"));
}

#[test]
fn test_normalize_phone_us_national() {
    let mut cmd = Command::cargo_bin("leadflow").unwrap();
    cmd.args(["normalize-phone", "(555) 123-4567", "--region", "US"])
        .assert()
        .success()
        .stdout(predicate::str::diff("+15551234567\n"));
}

#[test]
fn test_normalize_phone_keeps_unparseable_input() {
    let mut cmd = Command::cargo_bin("leadflow").unwrap();
    cmd.args(["normalize-phone", "call me", "--region", "US"])
        .assert()
        .success()
        .stdout(predicate::str::diff("call me\n"));
}

#[test]
fn test_normalize_phone_rejects_unknown_region() {
    let mut cmd = Command::cargo_bin("leadflow").unwrap();
    cmd.args(["normalize-phone", "5551234567", "--region", "ZZ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown region"));
}

#[test]
fn test_serve_requires_secrets() {
    let mut cmd = Command::cargo_bin("leadflow").unwrap();
    cmd.arg("serve")
        .env_remove("LEADFLOW_LLM_API_KEY")
        .env_remove("LEADFLOW_VOICE_WEBHOOK_SECRET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LEADFLOW_LLM_API_KEY"));
}

#[test]
fn test_migrate_creates_database() {
    let dir = std::env::temp_dir().join(format!("leadflow-cli-{}", std::process::id()));
    let db = dir.join("nested").join("leadflow.db");
    let mut cmd = Command::cargo_bin("leadflow").unwrap();
    cmd.arg("migrate")
        .env("LEADFLOW_DB_PATH", &db)
        .env_remove("LEADFLOW_DATABASE_URL")
        .assert()
        .success()
        .stdout(predicate::str::contains("sqlite schema is up to date"));
    assert!(db.exists());
    let _ = std::fs::remove_dir_all(&dir);
}
