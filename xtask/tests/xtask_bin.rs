use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn xtask() -> Command {
    cargo_bin_cmd!("xtask")
}

#[test]
fn xtask_help_runs() {
    xtask()
        .arg("help")
        .assert()
        .success()
        .stderr(predicate::str::contains("xtask commands"));
}

#[test]
fn unknown_command_fails() {
    xtask()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown xtask command"));
}

#[test]
fn print_schema_ids_lists_report_and_config() {
    xtask()
        .arg("print-schema-ids")
        .assert()
        .success()
        .stdout(predicate::str::contains("infraguard.report.v1"))
        .stdout(predicate::str::contains("infraguard.config.v1"));
}

#[test]
fn lint_policies_accepts_the_fixture_policies() {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/fixtures/policies");
    xtask()
        .args(["lint-policies", dir])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 policies loaded"))
        .stdout(predicate::str::contains("encryption: 1 policies"));
}

#[test]
fn lint_policies_reports_broken_documents() {
    let tmp = TempDir::new().expect("temp dir");
    fs::write(
        tmp.path().join("broken.yaml"),
        "metadata: {id: CKV2_LINT_1, category: general}\ndefinition: {and: []}\n",
    )
    .expect("write policy");

    xtask()
        .arg("lint-policies")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.yaml"))
        .stderr(predicate::str::contains("1 of 1 policy documents failed to load"));
}

#[test]
fn conform_checks_the_scan_fixtures() {
    xtask()
        .arg("conform")
        .assert()
        .success()
        .stdout(predicate::str::contains("fixture 'basic' matches expected.report.json"));
}
