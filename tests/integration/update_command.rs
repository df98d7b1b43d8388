use std::net::TcpListener;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{closed_port, release_json, TestEnv};

/// Config for an environment whose connectivity probe hits `port` and whose
/// scripts run under `/bin/sh` from the test's script directory.
fn config_with_probe(env: &TestEnv, port: u16, extra_top: &str) {
    env.write_config(&format!(
        "shell = \"/bin/sh\"\nscripts_dir = {:?}\ngrace_delay_ms = 20\n{}\
         [connectivity]\nhost = \"127.0.0.1\"\nport = {}\ntimeout_ms = 1000\n",
        env.scripts_dir().display().to_string(),
        extra_top,
        port
    ));
}

fn update(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("mupdater").unwrap();
    cmd.arg("-c").arg(&env.config_path).arg("update");
    cmd
}

#[test]
fn offline_update_starts_nothing() {
    let env = TestEnv::new();
    env.write_scripts("mkdir -p \"$MUPDATER_DOWNLOAD_DIR\"; echo started > \"$MUPDATER_DOWNLOAD_DIR/marker\"");
    config_with_probe(&env, closed_port(), "");

    update(&env)
        .args(["--mode", "download-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No internet connection"));
    assert!(!env.download_dir().join("marker").exists());
}

#[test]
fn download_only_succeeds_and_writes_log() {
    let online = TcpListener::bind("127.0.0.1:0").unwrap();
    let env = TestEnv::new();
    env.write_scripts(
        r#"
echo "Fetching the latest release information..."
echo "Locating the download resource for arm64 architecture..."
mkdir -p "$MUPDATER_DOWNLOAD_DIR"
echo "Finishing Up"
"#,
    );
    config_with_probe(&env, online.local_addr().unwrap().port(), "");

    update(&env)
        .args(["--mode", "download-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("succeeded"))
        .stdout(predicate::str::contains("Finishing Up"));

    let logs: Vec<_> = std::fs::read_dir(env.download_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("updater_log_"))
        .collect();
    assert_eq!(logs.len(), 1);
    let content = std::fs::read_to_string(logs[0].path()).unwrap();
    assert!(content.contains("Locating the download resource"));
}

#[test]
fn script_failure_is_reported_with_log_hint() {
    let online = TcpListener::bind("127.0.0.1:0").unwrap();
    let env = TestEnv::new();
    env.write_scripts("echo \"Fetching the latest release information...\"\nexit 1\n");
    config_with_probe(&env, online.local_addr().unwrap().port(), "");

    update(&env)
        .args(["--mode", "download-only"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("The update failed"))
        .stderr(predicate::str::contains("Check the log at"))
        .stderr(predicate::str::contains("update failed"));
}

#[test]
fn full_update_passes_password_from_stdin() {
    let online = TcpListener::bind("127.0.0.1:0").unwrap();
    let env = TestEnv::new();
    env.write_scripts(
        r#"
if [ "$3" = "hunter2" ]; then
  echo "Deleting the disk image..."
else
  echo "Sorry, try again."
fi
"#,
    );
    config_with_probe(&env, online.local_addr().unwrap().port(), "");

    update(&env)
        .args(["--mode", "full", "--password-stdin"])
        .write_stdin("hunter2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("100.0%"));

    update(&env)
        .args(["--mode", "full", "--password-stdin"])
        .write_stdin("wrong\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("password"));
}

#[test]
fn full_update_without_password_is_refused() {
    let online = TcpListener::bind("127.0.0.1:0").unwrap();
    let env = TestEnv::new();
    env.write_scripts("echo \"Deleting the disk image...\"");
    config_with_probe(&env, online.local_addr().unwrap().port(), "");

    update(&env)
        .args(["--mode", "full", "--password-stdin"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("administrator password"));
}

#[tokio::test]
async fn check_first_without_prerelease_runs_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            release_json("2024.3.45318", false),
        ])))
        .mount(&server)
        .await;

    let online = TcpListener::bind("127.0.0.1:0").unwrap();
    let env = TestEnv::new();
    env.write_scripts("mkdir -p \"$MUPDATER_DOWNLOAD_DIR\"; echo started > \"$MUPDATER_DOWNLOAD_DIR/marker\"");
    config_with_probe(
        &env,
        online.local_addr().unwrap().port(),
        &format!("api_base = {:?}\n", server.uri()),
    );

    let config = env.config_path.clone();
    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("mupdater")
            .unwrap()
            .arg("-c")
            .arg(config)
            .args(["update", "--channel", "snapshot", "--mode", "download-only", "--check-first"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("No prereleases found."))
        .stdout(predicate::str::contains("no update available"));
    assert!(!env.download_dir().join("marker").exists());
}

#[tokio::test]
async fn failed_release_lookup_starts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let online = TcpListener::bind("127.0.0.1:0").unwrap();
    let env = TestEnv::new();
    env.write_scripts("mkdir -p \"$MUPDATER_DOWNLOAD_DIR\"; echo started > \"$MUPDATER_DOWNLOAD_DIR/marker\"");
    config_with_probe(
        &env,
        online.local_addr().unwrap().port(),
        &format!("api_base = {:?}\n", server.uri()),
    );

    let config = env.config_path.clone();
    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("mupdater")
            .unwrap()
            .arg("-c")
            .arg(config)
            .args(["update", "--mode", "download-only", "--check-first"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("nothing was started"))
        .stderr(predicate::str::contains("not valid JSON"));
    assert!(!env.download_dir().join("marker").exists());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
