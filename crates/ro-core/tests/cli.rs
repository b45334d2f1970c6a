//! CLI surface smoke tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn missing_app_name_is_a_usage_error() {
    Command::cargo_bin("ro-core")
        .unwrap()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--app-name"));
}

#[test]
fn help_lists_the_flags() {
    Command::cargo_bin("ro-core")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--prometheus-url"))
        .stdout(predicate::str::contains("--config-file"));
}

#[test]
fn invalid_mode_is_rejected() {
    Command::cargo_bin("ro-core")
        .unwrap()
        .args(["--app-name", "web", "--mode", "hybrid"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unreadable_config_file_exits_one() {
    Command::cargo_bin("ro-core")
        .unwrap()
        .args([
            "--app-name",
            "web",
            "--config-file",
            "/nonexistent/settings.yaml",
            "--iterations",
            "1",
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn invalid_resource_limit_exits_one() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    use std::io::Write;
    config
        .write_all(b"resource_limits:\n  memory: 1.4\n")
        .unwrap();
    Command::cargo_bin("ro-core")
        .unwrap()
        .args(["--app-name", "web", "--mode", "private"])
        .arg("--config-file")
        .arg(config.path())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unreachable_cluster_exits_one() {
    Command::cargo_bin("ro-core")
        .unwrap()
        .env("KUBE_API_URL", "http://127.0.0.1:1")
        .args(["--app-name", "web", "--iterations", "1"])
        .assert()
        .failure()
        .code(1);
}
