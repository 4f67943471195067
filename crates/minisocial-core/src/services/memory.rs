//! In-process backend implementing both service traits.
//!
//! Used by tests and by `--local` sandbox mode. Data is ephemeral. Access
//! rules match the hosted database: inserts must carry the caller's uid as
//! `authorId`, and only the author may update or delete a document.
//!
//! Live query callbacks always run after the state lock is released. Each
//! snapshot is stamped with the store version that produced it, and a
//! watcher skips any snapshot older than the last one it saw.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::debug;

use super::firebase_auth::auth_message;
use super::identity::{AuthStateCallback, AuthStatus, IdentityService, subscribe_status};
use super::store::{
    Document, DocumentStore, LiveQueryCallback, LiveQueryEvent, OrderBy, is_server_timestamp,
    sort_documents,
};
use super::{ServiceError, ServiceErrorKind, ServiceResult};
use crate::post::{Identity, Post};
use crate::subscription::{Delivery, Subscription};
use crate::validation::{PASSWORD_MIN_CHARS, validate_email};

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: String,
}

struct Watcher {
    collection: String,
    order: OrderBy,
    delivery: Delivery,
    callback: Arc<LiveQueryCallback>,
    last_version: Arc<AtomicU64>,
}

/// A snapshot waiting to be delivered once the state lock is released.
struct Pending {
    delivery: Delivery,
    callback: Arc<LiveQueryCallback>,
    last_version: Arc<AtomicU64>,
    version: u64,
    event: LiveQueryEvent,
}

impl Pending {
    fn deliver(self) {
        let Pending {
            delivery,
            callback,
            last_version,
            version,
            event,
        } = self;
        // stored as version + 1 so the first snapshot of an untouched store
        // (version 0) still counts as new
        let stamp = version + 1;
        delivery.deliver(|| {
            if last_version.fetch_max(stamp, Ordering::SeqCst) < stamp {
                callback(event);
            }
        });
    }
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    collections: HashMap<String, BTreeMap<String, Map<String, Value>>>,
    next_id: u64,
    last_created_ms: i64,
    version: u64,
    offline: bool,
    watchers: Vec<Watcher>,
}

impl State {
    fn snapshot(&self, collection: &str, order: &OrderBy) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        sort_documents(&mut docs, order);
        docs
    }

    /// Bumps the version and collects a snapshot for every live watcher of
    /// `collection`.
    fn changed(&mut self, collection: &str) -> Vec<Pending> {
        self.version += 1;
        self.watchers.retain(|w| w.delivery.is_active());
        self.watchers
            .iter()
            .filter(|w| w.collection == collection)
            .map(|w| Pending {
                delivery: w.delivery.clone(),
                callback: Arc::clone(&w.callback),
                last_version: Arc::clone(&w.last_version),
                version: self.version,
                event: LiveQueryEvent::Snapshot(self.snapshot(collection, &w.order)),
            })
            .collect()
    }

    /// Creation time in millis, strictly increasing across inserts.
    fn next_timestamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_created_ms = now.max(self.last_created_ms + 1);
        self.last_created_ms
    }

    fn check_online(&self) -> ServiceResult<()> {
        if self.offline {
            Err(ServiceError::new(
                ServiceErrorKind::Network,
                "Connection failed: backend offline",
            ))
        } else {
            Ok(())
        }
    }
}

/// Ephemeral identity service and document store.
pub struct MemoryBackend {
    state: Mutex<State>,
    status: watch::Sender<AuthStatus>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates a backend whose auth state is already resolved (signed out).
    pub fn new() -> Self {
        let backend = Self::unresolved();
        backend.status.send_replace(AuthStatus::SignedOut);
        backend
    }

    /// Creates a backend that stays `Unresolved` until
    /// [`MemoryBackend::resolve`] is called, like a hosted service that is
    /// still checking for a saved session.
    pub fn unresolved() -> Self {
        let (status, _) = watch::channel(AuthStatus::Unresolved);
        Self {
            state: Mutex::new(State::default()),
            status,
        }
    }

    /// Leaves the `Unresolved` state as signed out. No-op once resolved.
    pub fn resolve(&self) {
        self.status.send_if_modified(|status| {
            if *status == AuthStatus::Unresolved {
                *status = AuthStatus::SignedOut;
                true
            } else {
                false
            }
        });
    }

    /// Makes every subsequent call fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Terminates every open live query with `error`.
    pub fn fail_live_queries(&self, error: &ServiceError) {
        let pending: Vec<Pending> = {
            let mut state = self.lock();
            state.version += 1;
            let version = state.version;
            state
                .watchers
                .drain(..)
                .filter(|w| w.delivery.is_active())
                .map(|w| Pending {
                    delivery: w.delivery,
                    callback: w.callback,
                    last_version: w.last_version,
                    version,
                    event: LiveQueryEvent::Failed(error.clone()),
                })
                .collect()
        };
        pending.into_iter().for_each(Pending::deliver);
    }

    /// Number of live queries that have not been disposed.
    pub fn active_live_queries(&self) -> usize {
        let mut state = self.lock();
        state.watchers.retain(|w| w.delivery.is_active());
        state.watchers.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signed_in_uid(&self) -> ServiceResult<String> {
        self.status
            .borrow()
            .identity()
            .map(|identity| identity.uid.clone())
            .ok_or_else(|| ServiceError::permission_denied("Permission denied"))
    }

    fn sign_in_account(&self, account: &Account) -> Identity {
        let identity = Identity::new(account.uid.clone(), Some(account.email.clone()));
        self.status
            .send_replace(AuthStatus::SignedIn(identity.clone()));
        identity
    }
}

fn auth_error(code: &str) -> ServiceError {
    ServiceError::new(ServiceErrorKind::Auth, auth_message(code))
}

fn owner_of(fields: &Map<String, Value>) -> Option<&str> {
    fields.get(Post::AUTHOR_ID).and_then(Value::as_str)
}

impl IdentityService for MemoryBackend {
    fn create_account<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, ServiceResult<Identity>> {
        Box::pin(async move {
            let account = {
                let mut state = self.lock();
                state.check_online()?;
                if !validate_email(email) {
                    return Err(auth_error("INVALID_EMAIL"));
                }
                if password.chars().count() < PASSWORD_MIN_CHARS {
                    return Err(auth_error("WEAK_PASSWORD"));
                }
                let key = email.to_lowercase();
                if state.accounts.contains_key(&key) {
                    return Err(auth_error("EMAIL_EXISTS"));
                }
                state.next_id += 1;
                let account = Account {
                    uid: format!("uid-{:04}", state.next_id),
                    email: email.to_string(),
                    password: password.to_string(),
                };
                state.accounts.insert(key, account.clone());
                account
            };
            debug!(uid = %account.uid, "Account created");
            Ok(self.sign_in_account(&account))
        })
    }

    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, ServiceResult<Identity>> {
        Box::pin(async move {
            let account = {
                let state = self.lock();
                state.check_online()?;
                state
                    .accounts
                    .get(&email.to_lowercase())
                    .filter(|account| account.password == password)
                    .cloned()
                    .ok_or_else(|| auth_error("INVALID_LOGIN_CREDENTIALS"))?
            };
            Ok(self.sign_in_account(&account))
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, ServiceResult<()>> {
        Box::pin(async move {
            self.lock().check_online()?;
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
        Box::pin(async move {
            Ok(self
                .current_identity()
                .map(|identity| format!("memory-token-{}", identity.uid)))
        })
    }

    fn refresh_access_token(&self) -> BoxFuture<'_, ServiceResult<Option<String>>> {
        self.access_token()
    }
}

impl DocumentStore for MemoryBackend {
    fn insert<'a>(
        &'a self,
        collection: &'a str,
        mut fields: Map<String, Value>,
    ) -> BoxFuture<'a, ServiceResult<String>> {
        Box::pin(async move {
            let uid = self.signed_in_uid();
            let (id, pending) = {
                let mut state = self.lock();
                state.check_online()?;
                let uid = uid?;
                if owner_of(&fields) != Some(uid.as_str()) {
                    return Err(ServiceError::permission_denied("Permission denied"));
                }

                let timestamp_keys: Vec<String> = fields
                    .iter()
                    .filter(|(_, v)| is_server_timestamp(v))
                    .map(|(k, _)| k.clone())
                    .collect();
                for key in timestamp_keys {
                    let now = state.next_timestamp();
                    fields.insert(key, Value::from(now));
                }

                state.next_id += 1;
                let id = format!("doc-{:08}", state.next_id);
                state
                    .collections
                    .entry(collection.to_string())
                    .or_default()
                    .insert(id.clone(), fields);
                (id, state.changed(collection))
            };
            debug!(collection, id, "Inserted");
            pending.into_iter().for_each(Pending::deliver);
            Ok(id)
        })
    }

    fn query_ordered<'a>(
        &'a self,
        collection: &'a str,
        order: &'a OrderBy,
    ) -> BoxFuture<'a, ServiceResult<Vec<Document>>> {
        Box::pin(async move {
            let state = self.lock();
            state.check_online()?;
            Ok(state.snapshot(collection, order))
        })
    }

    fn live_query_ordered(
        &self,
        collection: &str,
        order: OrderBy,
        callback: LiveQueryCallback,
    ) -> Subscription {
        let (subscription, delivery) = Subscription::new();
        let callback = Arc::new(callback);
        let last_version = Arc::new(AtomicU64::new(0));

        let initial = {
            let mut state = self.lock();
            let event = match state.check_online() {
                Ok(()) => LiveQueryEvent::Snapshot(state.snapshot(collection, &order)),
                Err(e) => LiveQueryEvent::Failed(e),
            };
            if matches!(event, LiveQueryEvent::Snapshot(_)) {
                state.watchers.push(Watcher {
                    collection: collection.to_string(),
                    order,
                    delivery: delivery.clone(),
                    callback: Arc::clone(&callback),
                    last_version: Arc::clone(&last_version),
                });
            }
            Pending {
                delivery,
                callback,
                last_version,
                version: state.version,
                event,
            }
        };
        initial.deliver();
        subscription
    }

    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move {
            let uid = self.signed_in_uid();
            let pending = {
                let mut state = self.lock();
                state.check_online()?;
                let uid = uid?;
                let doc = state
                    .collections
                    .get_mut(collection)
                    .and_then(|docs| docs.get_mut(id))
                    .ok_or_else(|| {
                        ServiceError::new(ServiceErrorKind::NotFound, format!("No document {id}"))
                    })?;
                if owner_of(doc) != Some(uid.as_str()) {
                    return Err(ServiceError::permission_denied("Permission denied"));
                }
                for (key, value) in fields {
                    if value.is_null() {
                        doc.remove(&key);
                    } else {
                        doc.insert(key, value);
                    }
                }
                state.changed(collection)
            };
            pending.into_iter().for_each(Pending::deliver);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move {
            let uid = self.signed_in_uid();
            let pending = {
                let mut state = self.lock();
                state.check_online()?;
                let uid = uid?;
                let docs = state.collections.get_mut(collection).ok_or_else(|| {
                    ServiceError::new(ServiceErrorKind::NotFound, format!("No document {id}"))
                })?;
                let owner = docs
                    .get(id)
                    .map(|doc| owner_of(doc).map(str::to_string))
                    .ok_or_else(|| {
                        ServiceError::new(ServiceErrorKind::NotFound, format!("No document {id}"))
                    })?;
                if owner.as_deref() != Some(uid.as_str()) {
                    return Err(ServiceError::permission_denied("Permission denied"));
                }
                docs.remove(id);
                state.changed(collection)
            };
            pending.into_iter().for_each(Pending::deliver);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use serde_json::json;

    use super::*;
    use crate::services::store::server_timestamp;

    fn fields(author_id: &str, title: &str) -> Map<String, Value> {
        let Value::Object(fields) = json!({
            "title": title,
            "content": "body",
            "authorId": author_id,
            "createdAt": server_timestamp(),
        }) else {
            unreachable!()
        };
        fields
    }

    fn recorder() -> (LiveQueryCallback, Arc<StdMutex<Vec<LiveQueryEvent>>>) {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (
            Box::new(move |event| sink.lock().unwrap().push(event)),
            events,
        )
    }

    fn snapshot_titles(event: &LiveQueryEvent) -> Vec<String> {
        match event {
            LiveQueryEvent::Snapshot(docs) => docs
                .iter()
                .map(|d| d.fields["title"].as_str().unwrap().to_string())
                .collect(),
            LiveQueryEvent::Failed(e) => panic!("unexpected failure: {e}"),
        }
    }

    #[tokio::test]
    async fn test_insert_requires_matching_author() {
        let backend = MemoryBackend::new();
        let err = backend.insert("posts", fields("uid-x", "t")).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::PermissionDenied);

        let me = backend.create_account("a@b.co", "secret1").await.unwrap();
        let err = backend.insert("posts", fields("someone-else", "t")).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::PermissionDenied);

        backend.insert("posts", fields(&me.uid, "t")).await.unwrap();
    }

    #[tokio::test]
    async fn test_creation_times_strictly_increase() {
        let backend = MemoryBackend::new();
        let me = backend.create_account("a@b.co", "secret1").await.unwrap();
        for i in 0..5 {
            backend
                .insert("posts", fields(&me.uid, &format!("p{i}")))
                .await
                .unwrap();
        }

        let docs = backend
            .query_ordered("posts", &OrderBy::ascending("createdAt"))
            .await
            .unwrap();
        let times: Vec<i64> = docs
            .iter()
            .map(|d| d.fields["createdAt"].as_i64().unwrap())
            .collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_live_query_delivers_initial_and_changes() {
        let backend = MemoryBackend::new();
        let me = backend.create_account("a@b.co", "secret1").await.unwrap();
        backend.insert("posts", fields(&me.uid, "first")).await.unwrap();

        let (callback, events) = recorder();
        let sub = backend.live_query_ordered("posts", OrderBy::descending("createdAt"), callback);
        backend.insert("posts", fields(&me.uid, "second")).await.unwrap();

        {
            let events = events.lock().unwrap();
            assert_eq!(events.len(), 2);
            assert_eq!(snapshot_titles(&events[0]), ["first"]);
            assert_eq!(snapshot_titles(&events[1]), ["second", "first"]);
        }

        sub.dispose();
        backend.insert("posts", fields(&me.uid, "third")).await.unwrap();
        assert_eq!(events.lock().unwrap().len(), 2);
        assert_eq!(backend.active_live_queries(), 0);
    }

    #[tokio::test]
    async fn test_only_owner_may_update_or_delete() {
        let backend = MemoryBackend::new();
        let owner = backend.create_account("owner@b.co", "secret1").await.unwrap();
        let id = backend.insert("posts", fields(&owner.uid, "mine")).await.unwrap();

        backend.sign_out().await.unwrap();
        backend.create_account("other@b.co", "secret2").await.unwrap();

        let mut edit = Map::new();
        edit.insert("title".to_string(), json!("hijacked"));
        let err = backend.update_fields("posts", &id, edit.clone()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::PermissionDenied);
        let err = backend.delete("posts", &id).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::PermissionDenied);

        backend.authenticate("owner@b.co", "secret1").await.unwrap();
        backend.update_fields("posts", &id, edit).await.unwrap();
        backend.delete("posts", &id).await.unwrap();

        let err = backend.delete("posts", &id).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_account_errors() {
        let backend = MemoryBackend::new();
        backend.create_account("a@b.co", "secret1").await.unwrap();

        let err = backend.create_account("A@b.co", "secret1").await.unwrap_err();
        assert_eq!(err.message, "An account with this email already exists.");

        let err = backend.authenticate("a@b.co", "wrong-pass").await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Auth);
        assert_eq!(err.message, "Invalid email or password.");

        let err = backend.create_account("new@b.co", "123").await.unwrap_err();
        assert_eq!(err.message, "Password must be at least 6 characters long");
    }

    #[tokio::test]
    async fn test_offline_fails_with_network_error() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        let err = backend
            .query_ordered("posts", &OrderBy::descending("createdAt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Network);
    }

    #[tokio::test]
    async fn test_fail_live_queries_ends_subscriptions() {
        let backend = MemoryBackend::new();
        let (callback, events) = recorder();
        let _sub = backend.live_query_ordered("posts", OrderBy::descending("createdAt"), callback);

        backend.fail_live_queries(&ServiceError::permission_denied("revoked"));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], LiveQueryEvent::Failed(_)));
        drop(events);
        assert_eq!(backend.active_live_queries(), 0);
    }

    #[test]
    fn test_resolve_leaves_unresolved_once() {
        let backend = MemoryBackend::unresolved();
        assert!(backend.status.borrow().resolved().is_none());
        backend.resolve();
        assert_eq!(*backend.status.borrow(), AuthStatus::SignedOut);
    }
}
