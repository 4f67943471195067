use std::sync::Arc;

use minisocial_core::session::{AuthSession, SessionReader};
use tracing::debug;

use crate::events::UiEvent;
use crate::runtime::inbox::UiEventSender;

pub async fn login(session: Arc<AuthSession>, email: String, password: String) -> UiEvent {
    UiEvent::LoginFinished(session.login(&email, &password).await)
}

pub async fn register(session: Arc<AuthSession>, email: String, password: String) -> UiEvent {
    UiEvent::RegisterFinished(session.register(&email, &password).await)
}

pub async fn logout(session: Arc<AuthSession>) -> UiEvent {
    UiEvent::LogoutFinished(session.logout().await)
}

/// Pushes the current session state and every later change to the inbox.
/// Ends when the session or the inbox goes away.
pub async fn forward_session(mut reader: SessionReader, tx: UiEventSender) {
    if tx.send(UiEvent::Session(reader.snapshot())).is_err() {
        return;
    }
    while let Some(state) = reader.changed().await {
        if tx.send(UiEvent::Session(state)).is_err() {
            break;
        }
    }
    debug!("Session forwarder stopped");
}
