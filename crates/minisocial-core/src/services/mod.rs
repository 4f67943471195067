//! External collaborators: the identity service and the document store.
//!
//! Both are traits so the app can run against Firebase over HTTPS or the
//! in-process [`memory::MemoryBackend`].

pub mod backend;
pub mod firebase_auth;
pub mod identity;
pub mod memory;
pub mod rtdb;
pub mod sse;
pub mod store;

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use self::backend::Backend;
pub use self::firebase_auth::FirebaseAuth;
pub use self::identity::IdentityService;
pub use self::memory::MemoryBackend;
pub use self::rtdb::RealtimeDatabase;
pub use self::store::DocumentStore;

/// Standard User-Agent header for Mini Social requests.
pub const USER_AGENT: &str = concat!("minisocial/", env!("CARGO_PKG_VERSION"));

pub const API_KEY_ENV: &str = "MINISOCIAL_API_KEY";
pub const DATABASE_URL_ENV: &str = "MINISOCIAL_DATABASE_URL";
pub const AUTH_BASE_URL_ENV: &str = "MINISOCIAL_AUTH_BASE_URL";
pub const TOKEN_BASE_URL_ENV: &str = "MINISOCIAL_TOKEN_BASE_URL";

// ============================================================================
// Config resolution helpers
// ============================================================================

/// Resolves an API key with precedence: config > env.
///
/// # Errors
/// Returns an error if neither source provides a key.
pub fn resolve_api_key(
    config_api_key: Option<&str>,
    env_var: &str,
    config_section: &str,
) -> Result<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::env::var(env_var).context(format!(
        "No API key available. Set {env_var} or api_key in [{config_section}]."
    ))
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    service_name: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, service_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, service_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str, service_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {service_name} URL: {url}"))?;
    Ok(())
}

/// Builds the shared HTTP client with the configured request timeout.
///
/// # Errors
/// Returns an error if the TLS backend fails to initialize.
pub fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}

/// Like [`build_http_client`] but only bounds connection setup.
///
/// Live queries stay open indefinitely, so a whole-request timeout would
/// cut them off.
///
/// # Errors
/// Returns an error if the TLS backend fails to initialize.
pub fn build_streaming_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder.build().context("Failed to build streaming HTTP client")
}

// ============================================================================
// Errors
// ============================================================================

/// Categories of service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Connection failed or was reset
    Network,
    /// Request took longer than the configured timeout
    Timeout,
    /// Non-success HTTP status without a more specific meaning
    HttpStatus,
    /// Credentials rejected or missing
    Auth,
    /// Access rules refused the operation
    PermissionDenied,
    /// Document does not exist
    NotFound,
    /// Unexpected response shape
    Parse,
    /// Missing or invalid local configuration
    Config,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorKind::Network => write!(f, "network"),
            ServiceErrorKind::Timeout => write!(f, "timeout"),
            ServiceErrorKind::HttpStatus => write!(f, "http_status"),
            ServiceErrorKind::Auth => write!(f, "auth"),
            ServiceErrorKind::PermissionDenied => write!(f, "permission_denied"),
            ServiceErrorKind::NotFound => write!(f, "not_found"),
            ServiceErrorKind::Parse => write!(f, "parse"),
            ServiceErrorKind::Config => write!(f, "config"),
        }
    }
}

/// Structured error from a service with kind and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::PermissionDenied, message)
    }

    pub fn not_signed_in() -> Self {
        Self::new(ServiceErrorKind::Auth, "Not signed in")
    }

    /// Creates an error from a non-success HTTP response.
    ///
    /// 401/403 become `PermissionDenied`, 404 `NotFound`. The message is
    /// taken from the JSON body when it has one, in either the
    /// `{"error": {"message": ..}}` or the `{"error": ".."}` shape.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ServiceErrorKind::PermissionDenied,
            404 => ServiceErrorKind::NotFound,
            _ => ServiceErrorKind::HttpStatus,
        };

        let details = (!body.is_empty()).then(|| body.to_string());
        let body_message = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            let error = json.get("error")?;
            error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map(str::to_string)
        });

        let message = match body_message {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind,
            message,
            details,
        }
    }

    /// Service-provided error code, when the body carried one.
    pub fn code(&self) -> Option<&str> {
        self.message
            .strip_prefix("HTTP ")?
            .split_once(": ")
            .map(|(_, code)| code)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Result type for service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

pub fn classify_reqwest_error(e: &reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::new(ServiceErrorKind::Timeout, format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ServiceError::new(ServiceErrorKind::Network, format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ServiceError::new(ServiceErrorKind::Parse, format!("Invalid response: {e}"))
    } else {
        ServiceError::new(ServiceErrorKind::Network, format!("Network error: {e}"))
    }
}

/// Reads a response body, turning non-success statuses into errors.
pub(crate) async fn read_success_body(response: reqwest::Response) -> ServiceResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;
    if !status.is_success() {
        return Err(ServiceError::http_status(status.as_u16(), &body));
    }
    Ok(body)
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    body: &str,
    what: &str,
) -> ServiceResult<T> {
    serde_json::from_str(body).map_err(|e| {
        ServiceError::new(ServiceErrorKind::Parse, format!("Failed to parse {what}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_nested_message() {
        let err = ServiceError::http_status(
            400,
            r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#,
        );
        assert_eq!(err.kind, ServiceErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 400: EMAIL_EXISTS");
        assert_eq!(err.code(), Some("EMAIL_EXISTS"));
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_extracts_flat_message() {
        let err = ServiceError::http_status(401, r#"{"error":"Permission denied"}"#);
        assert_eq!(err.kind, ServiceErrorKind::PermissionDenied);
        assert_eq!(err.message, "HTTP 401: Permission denied");
    }

    #[test]
    fn test_http_status_plain_body() {
        let err = ServiceError::http_status(503, "upstream unavailable");
        assert_eq!(err.kind, ServiceErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 503");
        assert_eq!(err.code(), None);
        assert_eq!(err.details.as_deref(), Some("upstream unavailable"));
    }

    #[test]
    fn test_http_status_not_found() {
        assert_eq!(
            ServiceError::http_status(404, "").kind,
            ServiceErrorKind::NotFound
        );
    }

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let key = resolve_api_key(Some("  from-config "), "MINISOCIAL_TEST_UNSET_KEY", "firebase")
            .unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn test_resolve_api_key_missing_mentions_env_var() {
        let err = resolve_api_key(None, "MINISOCIAL_TEST_UNSET_KEY", "firebase").unwrap_err();
        assert!(err.to_string().contains("MINISOCIAL_TEST_UNSET_KEY"));
        assert!(err.to_string().contains("[firebase]"));
    }

    #[test]
    fn test_resolve_base_url_validates_config_value() {
        let url = resolve_base_url(
            Some("http://127.0.0.1:9000/"),
            "MINISOCIAL_TEST_UNSET_URL",
            "https://default.example",
            "database",
        )
        .unwrap();
        assert_eq!(url, "http://127.0.0.1:9000");

        let err = resolve_base_url(
            Some("not a url"),
            "MINISOCIAL_TEST_UNSET_URL",
            "https://default.example",
            "database",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid database URL"));
    }

    #[test]
    fn test_resolve_base_url_default() {
        let url = resolve_base_url(
            None,
            "MINISOCIAL_TEST_UNSET_URL",
            "https://default.example",
            "database",
        )
        .unwrap();
        assert_eq!(url, "https://default.example");
    }
}
