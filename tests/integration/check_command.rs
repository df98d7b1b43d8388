use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{release_json, TestEnv};

async fn run_check(env: &TestEnv, channel: &str) -> assert_cmd::assert::Assert {
    let config = env.config_path.clone();
    let channel = channel.to_string();
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("mupdater")
            .unwrap()
            .args(["check", "--channel", &channel, "-c"])
            .arg(config)
            .assert()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn newer_release_is_announced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("2025.1.10000", false)))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    env.install_app("2024.3.45318");
    env.write_config(&format!("api_base = {:?}\n", server.uri()));

    run_check(&env, "release").await.success().stdout(predicate::str::contains(
        "A new release 2025.1.10000 is available. Installed version is 2024.3.45318.",
    ));
}

#[tokio::test]
async fn same_release_reports_up_to_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("2024.4.46012", false)))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    env.install_app("2024.3.45318");
    env.write_config(&format!("api_base = {:?}\n", server.uri()));

    run_check(&env, "release").await.success().stdout(predicate::str::contains(
        "MCreator is up to date with version 2024.3.45318. However, there may still be a newer patch update (2024.4.46012) available.",
    ));
}

#[tokio::test]
async fn snapshot_check_prints_newest_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            release_json("2024.3.45318", false),
            release_json("2024.4.00042", true),
        ])))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    env.install_app("2024.3.45318");
    env.write_config(&format!("api_base = {:?}\n", server.uri()));

    run_check(&env, "snapshot")
        .await
        .success()
        .stdout(predicate::str::contains("The newest snapshot available is 2024.4.00042."));
}

#[tokio::test]
async fn missing_app_is_reported_without_network() {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    env.write_config(&format!("api_base = {:?}\n", server.uri()));

    run_check(&env, "release")
        .await
        .success()
        .stdout(predicate::str::contains("MCreator.app not found in Applications."));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_failure_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    env.install_app("2024.3.45318");
    env.write_config(&format!("api_base = {:?}\n", server.uri()));

    run_check(&env, "release")
        .await
        .failure()
        .stderr(predicate::str::contains("Could not check for updates"))
        .stderr(predicate::str::contains("HTTP 404"));
}
