use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn about_describes_the_installer() {
    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("about")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scaffold Installer"))
        .stdout(predicate::str::contains("scaffold new <directory> [version]"));
}

#[test]
fn version_flag_reports_the_crate_version() {
    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_subcommand_fails_with_usage() {
    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("bogus")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
