//! Identity client against a mock identity service.

use std::sync::Arc;
use std::time::Duration;

use minisocial_core::post::Identity;
use minisocial_core::services::ServiceErrorKind;
use minisocial_core::services::firebase_auth::{FirebaseAuth, FirebaseAuthConfig, StoredSession};
use minisocial_core::services::identity::{AuthStatus, IdentityService};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, session_dir: Option<&TempDir>) -> FirebaseAuthConfig {
    FirebaseAuthConfig {
        api_key: "test-key".to_string(),
        auth_base_url: format!("{}/v1", server.uri()),
        token_base_url: format!("{}/v1", server.uri()),
        session_path: session_dir.map(|dir| dir.path().join("session.json")),
        request_timeout: Some(Duration::from_secs(5)),
    }
}

fn sign_in_body(uid: &str, email: &str, expires_in: &str) -> serde_json::Value {
    json!({
        "kind": "identitytoolkit#SignupNewUserResponse",
        "localId": uid,
        "email": email,
        "idToken": "id-token-1",
        "refreshToken": "refresh-token-1",
        "expiresIn": expires_in,
    })
}

fn error_body(code: &str) -> serde_json::Value {
    json!({"error": {"code": 400, "message": code, "errors": []}})
}

#[tokio::test]
async fn test_sign_up_signs_in_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "email": "new@example.com",
            "password": "secret1",
            "returnSecureToken": true,
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(sign_in_body(
                "uid-1",
                "new@example.com",
                "3600",
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(config(&server, None)).unwrap();
    auth.restore().await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _sub = auth.on_auth_state_changed(Box::new(move |identity| {
        let _ = tx.send(identity);
    }));
    assert_eq!(rx.recv().await, Some(None));

    let identity = auth.create_account("new@example.com", "secret1").await.unwrap();
    assert_eq!(
        identity,
        Identity::new("uid-1", Some("new@example.com".to_string()))
    );
    assert_eq!(rx.recv().await, Some(Some(identity.clone())));
    assert_eq!(auth.current_identity(), Some(identity));
    assert_eq!(
        auth.access_token().await.unwrap().as_deref(),
        Some("id-token-1")
    );
}

#[tokio::test]
async fn test_sign_in_error_codes_become_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(error_body("INVALID_LOGIN_CREDENTIALS")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("EMAIL_EXISTS")))
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(config(&server, None)).unwrap();

    let err = auth.authenticate("a@b.co", "wrong-pass").await.unwrap_err();
    assert_eq!(err.kind, ServiceErrorKind::Auth);
    assert_eq!(err.message, "Invalid email or password.");

    let err = auth.create_account("a@b.co", "secret1").await.unwrap_err();
    assert_eq!(err.message, "An account with this email already exists.");

    assert_eq!(auth.current_identity(), None);
}

#[tokio::test]
async fn test_expiring_token_is_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(sign_in_body("uid-2", "a@b.co", "30")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(query_param("key", "test-key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "refresh-token-2",
            "id_token": "id-token-2",
            "user_id": "uid-2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(config(&server, None)).unwrap();
    auth.authenticate("a@b.co", "secret1").await.unwrap();

    assert_eq!(
        auth.access_token().await.unwrap().as_deref(),
        Some("id-token-2")
    );
    // fresh now, no second exchange
    assert_eq!(
        auth.access_token().await.unwrap().as_deref(),
        Some("id-token-2")
    );
}

#[tokio::test]
async fn test_session_is_persisted_and_restored() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(sign_in_body("uid-3", "a@b.co", "3600")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("refresh_token=refresh-token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": "3600",
            "refresh_token": "refresh-token-2",
            "id_token": "id-token-2",
            "user_id": "uid-3",
        })))
        .mount(&server)
        .await;

    let first = FirebaseAuth::new(config(&server, Some(&dir))).unwrap();
    first.restore().await;
    first.authenticate("a@b.co", "secret1").await.unwrap();

    let stored = StoredSession::load(&dir.path().join("session.json"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.uid, "uid-3");
    assert_eq!(stored.refresh_token, "refresh-token-1");

    let second = FirebaseAuth::new(config(&server, Some(&dir))).unwrap();
    assert_eq!(second.status(), AuthStatus::Unresolved);
    second.restore().await;
    assert_eq!(
        second.status(),
        AuthStatus::SignedIn(Identity::new("uid-3", Some("a@b.co".to_string())))
    );

    second.sign_out().await.unwrap();
    assert_eq!(second.status(), AuthStatus::SignedOut);
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn test_rejected_session_is_removed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    StoredSession {
        uid: "uid-4".to_string(),
        email: None,
        refresh_token: "stale".to_string(),
    }
    .save(&session_path)
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("INVALID_REFRESH_TOKEN")))
        .mount(&server)
        .await;

    let auth = Arc::new(FirebaseAuth::new(config(&server, Some(&dir))).unwrap());
    auth.restore().await;

    assert_eq!(auth.status(), AuthStatus::SignedOut);
    assert!(!session_path.exists());
}

#[tokio::test]
async fn test_refresh_outage_keeps_session() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(sign_in_body("uid-5", "a@b.co", "30")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(config(&server, Some(&dir))).unwrap();
    auth.authenticate("a@b.co", "secret1").await.unwrap();

    let err = auth.access_token().await.unwrap_err();
    assert_eq!(err.kind, ServiceErrorKind::HttpStatus);

    assert_eq!(
        auth.current_identity(),
        Some(Identity::new("uid-5", Some("a@b.co".to_string())))
    );
    assert!(session_path.exists());
}

#[tokio::test]
async fn test_revoked_refresh_token_signs_out() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(sign_in_body("uid-6", "a@b.co", "30")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("TOKEN_EXPIRED")))
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(config(&server, Some(&dir))).unwrap();
    auth.authenticate("a@b.co", "secret1").await.unwrap();

    let err = auth.access_token().await.unwrap_err();
    assert_eq!(err.kind, ServiceErrorKind::Auth);
    assert_eq!(auth.status(), AuthStatus::SignedOut);
    assert!(!session_path.exists());
}
