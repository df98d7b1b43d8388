use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::TestEnv;

fn mupdater(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("mupdater").unwrap();
    cmd.arg("-c").arg(&env.config_path);
    cmd
}

#[test]
fn agent_is_disabled_by_default() {
    let env = TestEnv::new();
    env.write_config("");
    mupdater(&env)
        .args(["agent", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Background checks are disabled (every 10m)."));
}

#[test]
fn enable_persists_preference() {
    let env = TestEnv::new();
    env.write_config("grace_delay_ms = 1500\n");

    mupdater(&env)
        .args(["agent", "enable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled"));

    let saved = std::fs::read_to_string(&env.config_path).unwrap();
    assert!(saved.contains("enabled = true"), "{saved}");
    assert!(saved.contains("grace_delay_ms = 1500"), "{saved}");

    mupdater(&env)
        .args(["agent", "disable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Background checks are disabled"));
}

#[test]
fn watch_refuses_when_disabled() {
    let env = TestEnv::new();
    env.write_config("[agent]\nenabled = false\n");
    mupdater(&env)
        .args(["watch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Background checks are disabled"));
}
