//! Firebase Authentication REST client (email/password accounts).
//!
//! Sign-in state lives in a `watch` channel: `Unresolved` until
//! [`FirebaseAuth::restore`] has looked for a persisted session, then
//! `SignedOut` or `SignedIn`. The refresh token is optionally persisted to
//! `<home>/session.json` with restricted permissions (0600) so a restart
//! keeps the user signed in. Tokens are never logged.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::identity::{AuthStateCallback, AuthStatus, IdentityService, subscribe_status};
use super::{
    API_KEY_ENV, AUTH_BASE_URL_ENV, ServiceError, ServiceErrorKind, ServiceResult,
    TOKEN_BASE_URL_ENV, build_http_client, classify_reqwest_error, parse_json, read_success_body,
    resolve_api_key, resolve_base_url,
};
use crate::config::{Config, paths};
use crate::messages::AUTH_FAILED;
use crate::post::Identity;
use crate::subscription::Subscription;

pub const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";

/// Tokens expiring within this window are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct FirebaseAuthConfig {
    pub api_key: String,
    pub auth_base_url: String,
    pub token_base_url: String,
    /// Where the refresh token is persisted. `None` keeps the session in
    /// memory only.
    pub session_path: Option<PathBuf>,
    pub request_timeout: Option<Duration>,
}

impl FirebaseAuthConfig {
    /// Builds the client config from the app config and environment.
    ///
    /// Environment variables:
    /// - `MINISOCIAL_API_KEY`: web API key (fallback if not in config)
    /// - `MINISOCIAL_AUTH_BASE_URL`, `MINISOCIAL_TOKEN_BASE_URL`: endpoint
    ///   overrides, mainly for pointing tests at a mock server
    ///
    /// # Errors
    /// Returns an error if no API key is available or a URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = resolve_api_key(config.firebase.api_key.as_deref(), API_KEY_ENV, "firebase")?;
        let auth_base_url = resolve_base_url(
            config.firebase.auth_base_url.as_deref(),
            AUTH_BASE_URL_ENV,
            DEFAULT_AUTH_BASE_URL,
            "auth",
        )?;
        let token_base_url = resolve_base_url(
            config.firebase.token_base_url.as_deref(),
            TOKEN_BASE_URL_ENV,
            DEFAULT_TOKEN_BASE_URL,
            "token",
        )?;

        Ok(Self {
            api_key,
            auth_base_url,
            token_base_url,
            session_path: config.auth.persist_session.then(paths::session_path),
            request_timeout: config.request_timeout(),
        })
    }
}

#[derive(Debug, Clone)]
struct Tokens {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Tokens {
    fn new(id_token: String, refresh_token: String, expires_in: &str) -> Self {
        let lifetime = expires_in
            .trim()
            .parse::<i64>()
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Self {
            id_token,
            refresh_token,
            expires_at: Utc::now() + TimeDelta::seconds(lifetime),
        }
    }

    fn is_fresh(&self) -> bool {
        self.expires_at - Utc::now() > TimeDelta::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
    user_id: String,
}

/// Persisted session file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub refresh_token: String,
}

impl StoredSession {
    /// Loads a stored session. Returns `None` if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session from {}", path.display()))?;
        serde_json::from_str(&contents)
            .map(Some)
            .with_context(|| format!("Failed to parse session from {}", path.display()))
    }

    /// Saves the session with restricted permissions (0600).
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        let tmp_path = path.with_extension("json.tmp");

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })
    }
}

/// Maps identity-service error codes to messages fit for the user.
///
/// Only failures carrying a known service code become `Auth`. Transport
/// failures and bare HTTP errors (a 503 from a proxy, say) keep their kind
/// so callers can still tell an outage from a rejected credential.
pub fn map_auth_error(err: ServiceError) -> ServiceError {
    let message = auth_message(error_code(&err));
    if message == AUTH_FAILED {
        return err;
    }
    ServiceError {
        kind: ServiceErrorKind::Auth,
        message: message.to_string(),
        details: err.details,
    }
}

/// Service code without its detail suffix (`WEAK_PASSWORD : ...`).
fn error_code(err: &ServiceError) -> &str {
    err.code()
        .and_then(|code| code.split([' ', ':']).next())
        .unwrap_or_default()
}

/// Whether the token endpoint refused the refresh token itself, as opposed
/// to failing for a reason that may pass.
fn is_refresh_rejected(err: &ServiceError) -> bool {
    matches!(
        error_code(err),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" | "USER_DISABLED"
    )
}

/// Human message for an identity-service error code.
pub(crate) fn auth_message(code: &str) -> &'static str {
    match code {
        "EMAIL_EXISTS" => "An account with this email already exists.",
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password."
        }
        "USER_DISABLED" => "This account has been disabled.",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.",
        "WEAK_PASSWORD" => "Password must be at least 6 characters long",
        "INVALID_EMAIL" => "Invalid email address",
        "OPERATION_NOT_ALLOWED" => "Email/password sign-in is not enabled.",
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            "Your session has expired. Please log in again."
        }
        _ => AUTH_FAILED,
    }
}

/// Firebase Authentication client.
pub struct FirebaseAuth {
    config: FirebaseAuthConfig,
    http: reqwest::Client,
    /// Held across refreshes so concurrent callers share one exchange.
    tokens: Mutex<Option<Tokens>>,
    status: watch::Sender<AuthStatus>,
}

impl FirebaseAuth {
    /// Creates a client in the `Unresolved` state.
    ///
    /// # Panics
    /// - In test builds (`#[cfg(test)]`), panics if the auth endpoint is the
    ///   production one.
    /// - At runtime, panics if `MINISOCIAL_BLOCK_REAL_API=1` and the auth
    ///   endpoint is the production one.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FirebaseAuthConfig) -> Result<Self> {
        #[cfg(test)]
        if config.auth_base_url == DEFAULT_AUTH_BASE_URL {
            panic!(
                "Tests must not use the production identity service!\n\
                 Set MINISOCIAL_AUTH_BASE_URL to a mock server (e.g., wiremock).\n\
                 Found auth_base_url: {}",
                config.auth_base_url
            );
        }

        #[cfg(not(test))]
        if std::env::var("MINISOCIAL_BLOCK_REAL_API").is_ok_and(|v| v == "1")
            && config.auth_base_url == DEFAULT_AUTH_BASE_URL
        {
            panic!(
                "MINISOCIAL_BLOCK_REAL_API=1 but trying to use the production identity service!\n\
                 Set MINISOCIAL_AUTH_BASE_URL to a mock server.\n\
                 Found auth_base_url: {}",
                config.auth_base_url
            );
        }

        let http = build_http_client(config.request_timeout)?;
        let (status, _) = watch::channel(AuthStatus::Unresolved);
        Ok(Self {
            config,
            http,
            tokens: Mutex::new(None),
            status,
        })
    }

    pub fn status(&self) -> AuthStatus {
        self.status.borrow().clone()
    }

    /// Resolves the initial state from the persisted session, if any.
    ///
    /// A session that can no longer be refreshed is removed. Either way the
    /// state leaves `Unresolved`.
    pub async fn restore(&self) {
        let stored = match self.config.session_path.as_deref().map(StoredSession::load) {
            Some(Ok(stored)) => stored,
            Some(Err(e)) => {
                warn!("Ignoring unreadable session: {e:#}");
                self.forget_session();
                None
            }
            None => None,
        };

        let Some(stored) = stored else {
            self.status.send_replace(AuthStatus::SignedOut);
            return;
        };

        match self.exchange_refresh_token(&stored.refresh_token).await {
            Ok((uid, tokens)) => {
                let identity = Identity::new(uid, stored.email);
                info!(uid = %identity.uid, "Restored session");
                self.persist(&identity, &tokens);
                *self.tokens.lock().await = Some(tokens);
                self.status.send_replace(AuthStatus::SignedIn(identity));
            }
            Err(e) => {
                warn!(kind = %e.kind, "Failed to restore session: {e}");
                self.forget_session();
                self.status.send_replace(AuthStatus::SignedOut);
            }
        }
    }

    async fn sign_in(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> ServiceResult<Identity> {
        let url = format!("{}/accounts:{endpoint}", self.config.auth_base_url);
        debug!(endpoint, "Identity request");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let body = read_success_body(response).await.map_err(map_auth_error)?;
        let parsed: SignInResponse = parse_json(&body, "sign-in response")?;

        let identity = Identity::new(
            parsed.local_id,
            parsed.email.or_else(|| Some(email.to_string())),
        );
        let tokens = Tokens::new(parsed.id_token, parsed.refresh_token, &parsed.expires_in);
        self.persist(&identity, &tokens);
        *self.tokens.lock().await = Some(tokens);

        info!(uid = %identity.uid, endpoint, "Signed in");
        self.status.send_replace(AuthStatus::SignedIn(identity.clone()));
        Ok(identity)
    }

    /// Exchanges a refresh token for a new id token. Returns the uid too.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> ServiceResult<(String, Tokens)> {
        let url = format!("{}/token", self.config.token_base_url);
        debug!("Refreshing id token");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let body = read_success_body(response).await?;
        let parsed: RefreshResponse = parse_json(&body, "token refresh response")?;

        Ok((
            parsed.user_id,
            Tokens::new(parsed.id_token, parsed.refresh_token, &parsed.expires_in),
        ))
    }

    async fn token(&self, force_refresh: bool) -> ServiceResult<Option<String>> {
        let mut guard = self.tokens.lock().await;
        let Some(current) = guard.as_ref() else {
            return Ok(None);
        };
        if !force_refresh && current.is_fresh() {
            return Ok(Some(current.id_token.clone()));
        }

        let refresh_token = current.refresh_token.clone();
        match self.exchange_refresh_token(&refresh_token).await {
            Ok((_, tokens)) => {
                let id_token = tokens.id_token.clone();
                if let Some(identity) = self.current_identity() {
                    self.persist(&identity, &tokens);
                }
                *guard = Some(tokens);
                Ok(Some(id_token))
            }
            Err(e) if is_refresh_rejected(&e) => {
                warn!("Refresh token rejected, signing out: {e}");
                *guard = None;
                drop(guard);
                self.forget_session();
                self.status.send_replace(AuthStatus::SignedOut);
                Err(map_auth_error(e))
            }
            Err(e) => {
                warn!(kind = %e.kind, "Token refresh failed: {e}");
                Err(map_auth_error(e))
            }
        }
    }

    fn persist(&self, identity: &Identity, tokens: &Tokens) {
        let Some(path) = self.config.session_path.as_deref() else {
            return;
        };
        let stored = StoredSession {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            refresh_token: tokens.refresh_token.clone(),
        };
        if let Err(e) = stored.save(path) {
            warn!("Failed to persist session: {e:#}");
        }
    }

    fn forget_session(&self) {
        let Some(path) = self.config.session_path.as_deref() else {
            return;
        };
        if let Err(e) = fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove {}: {e}", path.display());
        }
    }
}

impl IdentityService for FirebaseAuth {
    fn create_account<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, ServiceResult<Identity>> {
        Box::pin(self.sign_in("signUp", email, password))
    }

    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, ServiceResult<Identity>> {
        Box::pin(self.sign_in("signInWithPassword", email, password))
    }

    fn sign_out(&self) -> BoxFuture<'_, ServiceResult<()>> {
        Box::pin(async move {
            *self.tokens.lock().await = None;
            self.forget_session();
            info!("Signed out");
            self.status.send_replace(AuthStatus::SignedOut);
            Ok(())
        })
    }

    fn on_auth_state_changed(&self, callback: AuthStateCallback) -> Subscription {
        subscribe_status(self.status.subscribe(), callback)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.status.borrow().identity().cloned()
    }

    fn access_token(&self) -> BoxFuture<'_, ServiceResult<Option<String>>> {
        Box::pin(self.token(false))
    }

    fn refresh_access_token(&self) -> BoxFuture<'_, ServiceResult<Option<String>>> {
        Box::pin(self.token(true))
    }
}
