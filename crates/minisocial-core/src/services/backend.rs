//! Wiring of the configured identity service and document store.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::firebase_auth::{FirebaseAuth, FirebaseAuthConfig};
use super::identity::IdentityService;
use super::memory::MemoryBackend;
use super::rtdb::{RealtimeDatabase, RealtimeDatabaseConfig};
use super::store::DocumentStore;
use crate::config::{BackendKind, Config};

/// The pair of services the app runs against.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityService>,
    pub store: Arc<dyn DocumentStore>,
    firebase: Option<Arc<FirebaseAuth>>,
}

impl Backend {
    /// Ephemeral in-process backend.
    pub fn memory() -> Self {
        let memory = Arc::new(MemoryBackend::new());
        Self {
            identity: Arc::clone(&memory) as Arc<dyn IdentityService>,
            store: memory,
            firebase: None,
        }
    }

    /// Builds the backend selected by `config.backend`, or the in-memory
    /// one when `force_memory` is set.
    ///
    /// # Errors
    /// Returns an error if the hosted backend is missing its API key or
    /// database URL.
    pub fn from_config(config: &Config, force_memory: bool) -> Result<Self> {
        if force_memory || config.backend == BackendKind::Memory {
            info!("Using in-memory backend");
            return Ok(Self::memory());
        }

        let auth = Arc::new(FirebaseAuth::new(FirebaseAuthConfig::from_config(config)?)?);
        let database = RealtimeDatabase::new(
            RealtimeDatabaseConfig::from_config(config)?,
            Arc::clone(&auth) as Arc<dyn IdentityService>,
        )?;
        info!("Using Firebase backend");

        Ok(Self {
            identity: Arc::clone(&auth) as Arc<dyn IdentityService>,
            store: Arc::new(database),
            firebase: Some(auth),
        })
    }

    /// Resolves the initial sign-in state (restoring a persisted session
    /// for the hosted backend). The in-memory backend is already resolved.
    pub async fn restore_session(&self) {
        if let Some(auth) = &self.firebase {
            auth.restore().await;
        }
    }
}
