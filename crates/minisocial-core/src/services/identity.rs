//! Identity service abstraction.

use futures_util::future::BoxFuture;
use tokio::sync::watch;

use super::ServiceResult;
use crate::post::Identity;
use crate::subscription::{Subscription, spawn_watch};

/// Receives `Some(identity)` on sign-in and `None` on sign-out.
pub type AuthStateCallback = Box<dyn Fn(Option<Identity>) + Send + Sync>;

/// Sign-in state tracked by an identity service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// Initial state until a persisted session has been checked.
    #[default]
    Unresolved,
    SignedOut,
    SignedIn(Identity),
}

impl AuthStatus {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthStatus::SignedIn(identity) => Some(identity),
            AuthStatus::Unresolved | AuthStatus::SignedOut => None,
        }
    }

    /// `None` while unresolved, otherwise the signed-in identity (if any).
    pub fn resolved(&self) -> Option<Option<Identity>> {
        match self {
            AuthStatus::Unresolved => None,
            AuthStatus::SignedOut => Some(None),
            AuthStatus::SignedIn(identity) => Some(Some(identity.clone())),
        }
    }
}

pub trait IdentityService: Send + Sync {
    /// Registers a new account and signs it in.
    fn create_account<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, ServiceResult<Identity>>;

    /// Signs in an existing account.
    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, ServiceResult<Identity>>;

    fn sign_out(&self) -> BoxFuture<'_, ServiceResult<()>>;

    /// Calls `callback` with the current state once it is resolved, then on
    /// every change, until the subscription is disposed.
    fn on_auth_state_changed(&self, callback: AuthStateCallback) -> Subscription;

    fn current_identity(&self) -> Option<Identity>;

    /// Bearer token for the document store, refreshed if close to expiry.
    /// `Ok(None)` when nobody is signed in.
    fn access_token(&self) -> BoxFuture<'_, ServiceResult<Option<String>>>;

    /// Like [`IdentityService::access_token`] but always exchanges the
    /// refresh token, for when the store reports the token as revoked.
    fn refresh_access_token(&self) -> BoxFuture<'_, ServiceResult<Option<String>>>;
}

/// Forwards resolved states from a status channel to `callback`.
pub(crate) fn subscribe_status(
    rx: watch::Receiver<AuthStatus>,
    callback: AuthStateCallback,
) -> Subscription {
    spawn_watch(rx, move |status: AuthStatus| {
        if let Some(identity) = status.resolved() {
            callback(identity);
        }
    })
}
