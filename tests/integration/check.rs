use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn check_passes_for_a_complete_project() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::create_dir_all(dir.path().join("config")).expect("mkdir");
    std::fs::write(dir.path().join("config/settings.yml"), "secret: x\n").expect("write");

    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("check")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("meets all requirements"));
}

#[test]
fn check_fails_without_the_settings_file() {
    let dir = tempfile::tempdir().expect("temp dir");

    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("check")
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("settings file"));
}
