use std::error::Error;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn dry_run_prints_request_with_defaults() -> Result<(), Box<dyn Error>> {
    let output = Command::cargo_bin("workbench-cli")?
        .args([
            "schedule",
            "--name",
            "nightly",
            "--cron",
            "0 2 * * *",
            "--start-date",
            "2030-01-01",
            "--dry-run",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let request: Value = serde_json::from_slice(&output)?;
    assert_eq!(request["name"], "nightly");
    assert_eq!(request["cron"], "0 2 * * *");
    assert_eq!(request["start_date"], "2030-01-01");
    assert!(request["next_run"].as_str().unwrap().ends_with('Z'));
    assert_eq!(request["end_date"].as_str().unwrap().len(), 10);
    Ok(())
}

#[test]
fn blank_cron_is_rejected_before_sending() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin("workbench-cli")?
        .args(["schedule", "--name", "nightly", "--cron", " ", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("schedule cron is required"));
    Ok(())
}
