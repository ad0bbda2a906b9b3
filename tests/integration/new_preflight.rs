use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn new_requires_a_directory_argument() {
    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("new")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn new_rejects_an_occupied_target_before_downloading() {
    let dir = tempfile::tempdir().expect("temp dir");
    let target = dir.path().join("blog");
    std::fs::create_dir_all(&target).expect("mkdir");
    std::fs::write(target.join("index.html"), "occupied").expect("write");

    // Preflight fails before any network activity, so this is safe offline.
    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("new")
        .arg(&target)
        .arg("3.4")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already a project"));

    // The pre-existing content is untouched
    assert!(target.join("index.html").is_file());
}

#[test]
fn new_rejects_an_empty_version_string() {
    let dir = tempfile::tempdir().expect("temp dir");
    let target = dir.path().join("blog");

    let mut cmd = Command::cargo_bin("scaffold").expect("binary exists");
    cmd.arg("new")
        .arg(&target)
        .arg("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("suggestion"));

    assert!(!target.exists());
}
