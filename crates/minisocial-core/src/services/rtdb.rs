//! Firebase Realtime Database REST client.
//!
//! Documents live at `{database_url}/{collection}/{id}.json`. Collections
//! come back as JSON objects keyed by id, which carry no order, so every
//! result set is sorted client-side with [`sort_documents`]. Live queries
//! use the streaming endpoint (`Accept: text/event-stream`) and mirror the
//! collection locally.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::identity::IdentityService;
use super::sse::{CollectionMirror, DatabaseEvent, SseParser, documents_from_value};
use super::store::{
    Document, DocumentStore, LiveQueryCallback, LiveQueryEvent, OrderBy, sort_documents,
};
use super::{
    DATABASE_URL_ENV, ServiceError, ServiceErrorKind, ServiceResult, build_http_client,
    build_streaming_client, classify_reqwest_error, parse_json, read_success_body,
    resolve_base_url,
};
use crate::config::Config;
use crate::subscription::{Delivery, Subscription};

#[derive(Debug, Clone)]
pub struct RealtimeDatabaseConfig {
    pub database_url: String,
    pub request_timeout: Option<Duration>,
}

impl RealtimeDatabaseConfig {
    /// Database URL resolution order:
    /// 1. `MINISOCIAL_DATABASE_URL` env var (if set and non-empty)
    /// 2. `database_url` in `[firebase]`
    ///
    /// # Errors
    /// Returns an error if neither is set or the URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let database_url = resolve_base_url(
            config.firebase.database_url.as_deref(),
            DATABASE_URL_ENV,
            "",
            "database",
        )?;
        if database_url.is_empty() {
            bail!(
                "No database URL available. Set {DATABASE_URL_ENV} or database_url in [firebase]."
            );
        }

        Ok(Self {
            database_url,
            request_timeout: config.request_timeout(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Realtime Database client. Requests are authorized with the identity
/// service's current id token.
pub struct RealtimeDatabase {
    config: RealtimeDatabaseConfig,
    http: reqwest::Client,
    streaming: reqwest::Client,
    identity: Arc<dyn IdentityService>,
}

impl RealtimeDatabase {
    /// # Errors
    /// Returns an error if the HTTP clients cannot be built.
    pub fn new(config: RealtimeDatabaseConfig, identity: Arc<dyn IdentityService>) -> Result<Self> {
        let http = build_http_client(config.request_timeout)?;
        let streaming = build_streaming_client(config.request_timeout)?;
        Ok(Self {
            config,
            http,
            streaming,
            identity,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}.json", self.config.database_url)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}.json", self.config.database_url)
    }

    async fn auth_query(&self) -> ServiceResult<Vec<(&'static str, String)>> {
        Ok(self
            .identity
            .access_token()
            .await?
            .map(|token| vec![("auth", token)])
            .unwrap_or_default())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ServiceResult<String> {
        let response = request
            .query(&self.auth_query().await?)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        read_success_body(response).await
    }
}

impl DocumentStore for RealtimeDatabase {
    fn insert<'a>(
        &'a self,
        collection: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, ServiceResult<String>> {
        Box::pin(async move {
            debug!(collection, "Insert");
            let body = self
                .send(self.http.post(self.collection_url(collection)).json(&fields))
                .await?;
            let pushed: PushResponse = parse_json(&body, "insert response")?;
            Ok(pushed.name)
        })
    }

    fn query_ordered<'a>(
        &'a self,
        collection: &'a str,
        order: &'a OrderBy,
    ) -> BoxFuture<'a, ServiceResult<Vec<Document>>> {
        Box::pin(async move {
            debug!(collection, field = %order.field, "Query");
            let body = self
                .send(self.http.get(self.collection_url(collection)))
                .await?;
            let value: Value = parse_json(&body, "query response")?;
            let mut docs = documents_from_value(&value);
            sort_documents(&mut docs, order);
            Ok(docs)
        })
    }

    fn live_query_ordered(
        &self,
        collection: &str,
        order: OrderBy,
        callback: LiveQueryCallback,
    ) -> Subscription {
        let (subscription, delivery) = Subscription::new();
        let query = LiveQuery {
            url: self.collection_url(collection),
            order,
            http: self.streaming.clone(),
            identity: Arc::clone(&self.identity),
        };
        info!(collection, "Live query opened");
        tokio::spawn(query.run(delivery, callback));
        subscription
    }

    fn update_fields<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Map<String, Value>,
    ) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move {
            debug!(collection, id, "Update");
            self.send(self.http.patch(self.document_url(collection, id)).json(&fields))
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move {
            debug!(collection, id, "Delete");
            self.send(self.http.delete(self.document_url(collection, id)))
                .await?;
            Ok(())
        })
    }
}

/// Owned state of one live query task.
struct LiveQuery {
    url: String,
    order: OrderBy,
    http: reqwest::Client,
    identity: Arc<dyn IdentityService>,
}

impl LiveQuery {
    async fn run(self, delivery: Delivery, callback: LiveQueryCallback) {
        let cancel = delivery.token();
        tokio::select! {
            () = cancel.cancelled() => debug!("Live query disposed"),
            result = self.stream(&delivery, &callback) => {
                if !delivery.is_active() {
                    return;
                }
                let err = match result {
                    Ok(()) => ServiceError::new(ServiceErrorKind::Network, "Live query ended"),
                    Err(e) => e,
                };
                warn!(kind = %err.kind, "Live query failed: {err}");
                delivery.deliver(|| callback(LiveQueryEvent::Failed(err)));
            }
        }
    }

    /// Follows the stream until it fails. Reconnects once if the server
    /// revokes the token.
    async fn stream(&self, delivery: &Delivery, callback: &LiveQueryCallback) -> ServiceResult<()> {
        let mut token = self.identity.access_token().await?;
        let mut reconnected = false;

        loop {
            let response = self.open(token.as_deref()).await?;
            let mut events = SseParser::new(response.bytes_stream());
            let mut mirror = CollectionMirror::default();

            loop {
                match events.next().await {
                    Some(Ok(DatabaseEvent::KeepAlive)) => {}
                    Some(Ok(DatabaseEvent::Cancel(reason))) => {
                        return Err(ServiceError::permission_denied(if reason.is_empty() {
                            "Live query cancelled by the server".to_string()
                        } else {
                            reason
                        }));
                    }
                    Some(Ok(DatabaseEvent::AuthRevoked)) => break,
                    Some(Ok(event)) => {
                        mirror.apply(&event);
                        let mut docs = mirror.documents();
                        sort_documents(&mut docs, &self.order);
                        if !delivery.deliver(|| callback(LiveQueryEvent::Snapshot(docs))) {
                            return Ok(());
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(ServiceError::new(
                            ServiceErrorKind::Network,
                            "Live query stream closed",
                        ));
                    }
                }
            }

            if reconnected {
                return Err(ServiceError::new(
                    ServiceErrorKind::Auth,
                    "Live query credentials were revoked",
                ));
            }
            reconnected = true;
            info!("Live query credentials revoked, reconnecting");
            token = self.identity.refresh_access_token().await?;
        }
    }

    async fn open(&self, token: Option<&str>) -> ServiceResult<reqwest::Response> {
        let mut request = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(token) = token {
            request = request.query(&[("auth", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::http_status(status.as_u16(), &body));
        }
        Ok(response)
    }
}
