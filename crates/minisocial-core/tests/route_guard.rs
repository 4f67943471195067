//! Navigation guard driven by a live session.

use std::sync::Arc;
use std::time::Duration;

use minisocial_core::routes::{GuardDecision, Navigator, Route};
use minisocial_core::services::MemoryBackend;
use minisocial_core::services::identity::IdentityService;
use minisocial_core::session::{AuthSession, SessionState};
use tokio::time::timeout;

#[tokio::test]
async fn test_no_redirect_while_session_loading() {
    let backend = Arc::new(MemoryBackend::unresolved());
    let session = AuthSession::start(Arc::clone(&backend) as Arc<dyn IdentityService>);
    assert!(session.state().loading);

    let mut nav = Navigator::new(Route::Login);
    assert_eq!(nav.resolve(&session.state()), GuardDecision::Wait);
    assert_eq!(nav.current(), &Route::Login);

    backend.resolve();
    let state = timeout(Duration::from_secs(2), session.reader().wait_until_resolved())
        .await
        .unwrap();
    assert_eq!(nav.resolve(&state), GuardDecision::Render);
}

#[tokio::test]
async fn test_login_route_redirects_home_once_signed_in() {
    let backend = Arc::new(MemoryBackend::new());
    let session = AuthSession::start(Arc::clone(&backend) as Arc<dyn IdentityService>);
    let mut reader = session.reader();
    reader.wait_until_resolved().await;

    let mut nav = Navigator::new(Route::Home);
    nav.push(Route::parse("/login"));
    assert_eq!(nav.resolve(&reader.snapshot()), GuardDecision::Render);

    session.login("nobody@example.com", "secret1").await.unwrap_err();
    session.register("me@example.com", "secret1").await.unwrap();
    let state = timeout(Duration::from_secs(2), async {
        loop {
            let state = reader.changed().await.unwrap_or_else(SessionState::loading);
            if state.is_signed_in() {
                break state;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(nav.resolve(&state), GuardDecision::Redirect(Route::Home));
    assert_eq!(nav.history(), &[Route::Home]);
}

#[tokio::test]
async fn test_register_route_redirects_home_when_signed_in() {
    let backend = Arc::new(MemoryBackend::new());
    backend.create_account("me@example.com", "secret1").await.unwrap();
    let session = AuthSession::start(Arc::clone(&backend) as Arc<dyn IdentityService>);
    let state = session.reader().wait_until_resolved().await;
    assert!(state.is_signed_in());

    let mut nav = Navigator::new(Route::Register);
    assert_eq!(nav.resolve(&state), GuardDecision::Redirect(Route::Home));
    assert_eq!(nav.current(), &Route::Home);
}

#[tokio::test]
async fn test_unknown_path_renders_for_everyone() {
    let mut nav = Navigator::new(Route::parse("/does/not/exist"));
    assert_eq!(
        nav.resolve(&SessionState::resolved(None)),
        GuardDecision::Render
    );
    assert_eq!(nav.current().path(), "/does/not/exist");
}
