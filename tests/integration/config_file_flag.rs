use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn missing_config_file_errors() {
    Command::cargo_bin("mupdater")
        .unwrap()
        .args(["agent", "status", "-c", "/tmp/definitely_missing_mupdater.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn invalid_config_lists_every_problem() {
    let env = TestEnv::new();
    env.write_config("repo = \"MCreator\"\nshell = \"\"\n");
    Command::cargo_bin("mupdater")
        .unwrap()
        .arg("-c")
        .arg(&env.config_path)
        .args(["agent", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"))
        .stderr(predicate::str::contains("owner/name"))
        .stderr(predicate::str::contains("`shell` must not be empty"));
}

#[test]
fn config_path_from_environment() {
    let env = TestEnv::new();
    env.write_config("[agent]\nenabled = true\ninterval_secs = 60\n");
    Command::cargo_bin("mupdater")
        .unwrap()
        .env("MUPDATER_CONFIG", &env.config_path)
        .args(["agent", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled (every 1m)"));
}
