use mupdater::release::{FetchError, GithubReleases, ReleaseLookup, VersionTag};
use mupdater::runner::Channel;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::release_json;

#[tokio::test]
async fn release_channel_reads_latest_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("2024.4.12345", false)))
        .expect(1)
        .mount(&server)
        .await;

    let releases = GithubReleases::new(&server.uri(), "MCreator/MCreator").unwrap();
    let lookup = releases.fetch_latest(Channel::Release).await.unwrap();
    assert_eq!(lookup, ReleaseLookup::Found(VersionTag::new("2024.4.12345")));
}

#[tokio::test]
async fn snapshot_channel_picks_first_prerelease() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases"))
        .and(query_param("per_page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            release_json("2024.3.45318", false),
            release_json("2024.4.00001", true),
            release_json("2024.4.00000", true),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let releases = GithubReleases::new(&server.uri(), "MCreator/MCreator").unwrap();
    let lookup = releases.fetch_latest(Channel::Snapshot).await.unwrap();
    assert_eq!(lookup, ReleaseLookup::Found(VersionTag::new("2024.4.00001")));
}

#[tokio::test]
async fn snapshot_channel_without_prerelease_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([release_json("2024.3.45318", false)])),
        )
        .mount(&server)
        .await;

    let releases = GithubReleases::new(&server.uri(), "MCreator/MCreator").unwrap();
    let lookup = releases.fetch_latest(Channel::Snapshot).await.unwrap();
    assert_eq!(lookup, ReleaseLookup::NoPrereleaseFound);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json("2024.4.1", false)))
        .expect(1)
        .mount(&server)
        .await;

    let releases = GithubReleases::new(&server.uri(), "MCreator/MCreator").unwrap();
    let lookup = releases.fetch_latest(Channel::Release).await.unwrap();
    assert_eq!(lookup, ReleaseLookup::Found(VersionTag::new("2024.4.1")));
}

#[tokio::test]
async fn persistent_server_error_gives_up_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let releases = GithubReleases::new(&server.uri(), "MCreator/MCreator").unwrap();
    let err = releases.fetch_latest(Channel::Release).await.unwrap_err();
    assert!(
        matches!(err, FetchError::Status { status: 503, ref body } if body == "unavailable"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let releases = GithubReleases::new(&server.uri(), "MCreator/MCreator").unwrap();
    let err = releases.fetch_latest(Channel::Release).await.unwrap_err();
    assert!(matches!(err, FetchError::RateLimited), "unexpected error: {err:?}");
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/MCreator/MCreator/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let releases = GithubReleases::new(&server.uri(), "MCreator/MCreator").unwrap();
    let err = releases.fetch_latest(Channel::Release).await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)), "unexpected error: {err:?}");
}
