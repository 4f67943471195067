//! Process-wide auth session.
//!
//! [`AuthSession`] is the only writer of [`SessionState`]. It registers
//! with the identity service once and rewrites the state on every
//! notification. The register/login/logout calls report failures but never
//! touch the state themselves. Everyone else reads through a
//! [`SessionReader`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::messages::{
    LOGIN_FAILED, LOGOUT_FAILED, NETWORK_ERROR, PERMISSION_DENIED, REGISTER_FAILED,
};
use crate::post::Identity;
use crate::services::identity::IdentityService;
use crate::services::{ServiceError, ServiceErrorKind};
use crate::subscription::Subscription;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// True until the identity service reports its first state.
    pub loading: bool,
    pub identity: Option<Identity>,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            identity: None,
        }
    }

    pub fn resolved(identity: Option<Identity>) -> Self {
        Self {
            loading: false,
            identity,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }
}

/// Read-only view of the session.
#[derive(Debug, Clone)]
pub struct SessionReader {
    rx: watch::Receiver<SessionState>,
}

impl SessionReader {
    pub fn snapshot(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.rx.borrow().identity.clone()
    }

    /// Waits for the next change. `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the session has left the loading state.
    pub async fn wait_until_resolved(&mut self) -> SessionState {
        let resolved = self
            .rx
            .wait_for(|state| !state.loading)
            .await
            .map(|state| state.clone());
        resolved.unwrap_or_else(|_| self.snapshot())
    }
}

pub struct AuthSession {
    identity: Arc<dyn IdentityService>,
    state: Arc<watch::Sender<SessionState>>,
    registration: Mutex<Option<Subscription>>,
}

impl AuthSession {
    /// Starts in the loading state and registers for auth notifications.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(identity: Arc<dyn IdentityService>) -> Self {
        let (tx, _) = watch::channel(SessionState::loading());
        let state = Arc::new(tx);

        let sink = Arc::clone(&state);
        let registration = identity.on_auth_state_changed(Box::new(move |identity| {
            debug!(signed_in = identity.is_some(), "Auth state changed");
            sink.send_replace(SessionState::resolved(identity));
        }));

        Self {
            identity,
            state,
            registration: Mutex::new(Some(registration)),
        }
    }

    pub fn reader(&self) -> SessionReader {
        SessionReader {
            rx: self.state.subscribe(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// # Errors
    /// Returns a display message if the account cannot be created.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), String> {
        self.identity
            .create_account(email, password)
            .await
            .map(|_| ())
            .map_err(|e| failure_message(&e, REGISTER_FAILED))
    }

    /// # Errors
    /// Returns a display message if the credentials are rejected.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), String> {
        self.identity
            .authenticate(email, password)
            .await
            .map(|_| ())
            .map_err(|e| failure_message(&e, LOGIN_FAILED))
    }

    /// # Errors
    /// Returns a display message if sign-out fails.
    pub async fn logout(&self) -> Result<(), String> {
        self.identity
            .sign_out()
            .await
            .map_err(|e| failure_message(&e, LOGOUT_FAILED))
    }

    /// Releases the notification registration. Idempotent.
    pub fn shutdown(&self) {
        let registration = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(registration) = registration {
            registration.dispose();
            info!("Auth session shut down");
        }
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn failure_message(err: &ServiceError, fallback: &str) -> String {
    match err.kind {
        ServiceErrorKind::Network | ServiceErrorKind::Timeout => NETWORK_ERROR.to_string(),
        ServiceErrorKind::PermissionDenied => PERMISSION_DENIED.to_string(),
        ServiceErrorKind::Auth => err.message.clone(),
        _ => fallback.to_string(),
    }
}
