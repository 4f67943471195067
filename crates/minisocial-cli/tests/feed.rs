//! `minisocial feed` against the in-memory backend and a mock database.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_local_feed_is_empty() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("minisocial")
        .env("MINISOCIAL_HOME", dir.path())
        .args(["feed", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No posts yet"))
        .stdout(predicate::str::contains("Be the first to share something!"));
}

async fn mock_database() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "older": {
                "title": "First post",
                "content": "hello",
                "author": "a@example.com",
                "authorId": "a",
                "createdAt": 1_700_000_000_000_i64
            },
            "newer": {
                "title": "Second post",
                "content": "again",
                "authorId": "b",
                "createdAt": 1_700_000_100_000_i64
            }
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_feed_prints_newest_first() {
    let server = mock_database().await;
    let dir = tempdir().unwrap();

    let output = cargo_bin_cmd!("minisocial")
        .env("MINISOCIAL_HOME", dir.path())
        .env("MINISOCIAL_API_KEY", "test-key")
        .env("MINISOCIAL_DATABASE_URL", server.uri())
        .env("MINISOCIAL_AUTH_BASE_URL", server.uri())
        .env("MINISOCIAL_TOKEN_BASE_URL", server.uri())
        .arg("feed")
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    let newer = stdout.find("Second post").expect("newer post printed");
    let older = stdout.find("First post").expect("older post printed");
    assert!(newer < older);
    assert!(stdout.contains("By Unknown"));
    assert!(stdout.contains("By a@example.com"));
}

#[tokio::test]
async fn test_feed_limit() {
    let server = mock_database().await;
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("minisocial")
        .env("MINISOCIAL_HOME", dir.path())
        .env("MINISOCIAL_API_KEY", "test-key")
        .env("MINISOCIAL_DATABASE_URL", server.uri())
        .env("MINISOCIAL_AUTH_BASE_URL", server.uri())
        .env("MINISOCIAL_TOKEN_BASE_URL", server.uri())
        .args(["feed", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Second post"))
        .stdout(predicate::str::contains("First post").not());
}

#[tokio::test]
async fn test_feed_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
        )
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("minisocial")
        .env("MINISOCIAL_HOME", dir.path())
        .env("MINISOCIAL_API_KEY", "test-key")
        .env("MINISOCIAL_DATABASE_URL", server.uri())
        .env("MINISOCIAL_AUTH_BASE_URL", server.uri())
        .env("MINISOCIAL_TOKEN_BASE_URL", server.uri())
        .arg("feed")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "You do not have permission to perform this action.",
        ));
}
