//! Post client: CRUD and the live feed over a [`DocumentStore`].
//!
//! Writes never touch local feed state. A new, edited, or deleted post
//! shows up through the next live delivery.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::messages::{NETWORK_ERROR, PERMISSION_DENIED, POST_LOAD_ERROR};
use crate::post::{Identity, Post, edit_fields, new_post_fields};
use crate::services::store::{Document, DocumentStore, LiveQueryEvent, OrderBy};
use crate::services::{ServiceError, ServiceErrorKind};
use crate::subscription::Subscription;
use crate::validation::{FormErrors, PostDraft};

pub const POSTS_COLLECTION: &str = "posts";

/// What the feed subscription pushes to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// Full feed, newest first. Replaces whatever the consumer holds.
    Posts(Vec<Post>),
    /// The live query ended; carries a display message.
    Failed(String),
}

pub type FeedCallback = Box<dyn Fn(FeedUpdate) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum PostError {
    /// Local validation failed; nothing was sent.
    Invalid(FormErrors),
    Service(ServiceError),
}

impl PostError {
    /// Display message for this error. `fallback` is the operation-specific
    /// message used for failures that are neither network nor permission
    /// problems.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            PostError::Invalid(errors) => errors.to_string(),
            PostError::Service(err) => service_message(err, fallback).to_string(),
        }
    }
}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostError::Invalid(errors) => write!(f, "{errors}"),
            PostError::Service(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PostError::Invalid(errors) => Some(errors),
            PostError::Service(err) => Some(err),
        }
    }
}

impl From<ServiceError> for PostError {
    fn from(err: ServiceError) -> Self {
        PostError::Service(err)
    }
}

impl From<FormErrors> for PostError {
    fn from(errors: FormErrors) -> Self {
        PostError::Invalid(errors)
    }
}

/// Maps a service failure to the message shown to the user.
pub fn service_message<'a>(err: &ServiceError, fallback: &'a str) -> &'a str {
    match err.kind {
        ServiceErrorKind::PermissionDenied => PERMISSION_DENIED,
        ServiceErrorKind::Network | ServiceErrorKind::Timeout => NETWORK_ERROR,
        _ => fallback,
    }
}

fn newest_first() -> OrderBy {
    OrderBy::descending(Post::CREATED_AT)
}

/// Converts documents to posts, skipping (and logging) malformed ones.
fn to_posts(docs: Vec<Document>) -> Vec<Post> {
    docs.into_iter()
        .filter_map(|doc| match Post::from_document(doc) {
            Ok(post) => Some(post),
            Err(e) => {
                warn!("Skipping post: {e}");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn DocumentStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validates `draft` and stores it as a new post by `author`.
    ///
    /// # Errors
    /// `Invalid` without any network call if the draft fails validation,
    /// `Service` if the store rejects the write.
    pub async fn create_post(
        &self,
        draft: &PostDraft,
        author: &Identity,
    ) -> Result<String, PostError> {
        draft.validate()?;
        let id = self
            .store
            .insert(
                POSTS_COLLECTION,
                new_post_fields(&draft.title, &draft.content, author),
            )
            .await?;
        info!(id, uid = %author.uid, "Post created");
        Ok(id)
    }

    /// One-shot fetch of the whole feed, newest first.
    ///
    /// # Errors
    /// Returns the store error if the query fails.
    pub async fn get_posts(&self) -> Result<Vec<Post>, PostError> {
        let order = newest_first();
        let docs = self.store.query_ordered(POSTS_COLLECTION, &order).await?;
        debug!(count = docs.len(), "Fetched posts");
        Ok(to_posts(docs))
    }

    /// Opens the live feed. `callback` receives the full feed on every
    /// change until the subscription is disposed.
    pub fn subscribe_to_posts(&self, callback: FeedCallback) -> Subscription {
        info!("Subscribing to feed");
        self.store.live_query_ordered(
            POSTS_COLLECTION,
            newest_first(),
            Box::new(move |event| match event {
                LiveQueryEvent::Snapshot(docs) => callback(FeedUpdate::Posts(to_posts(docs))),
                LiveQueryEvent::Failed(err) => {
                    let message = service_message(&err, POST_LOAD_ERROR);
                    callback(FeedUpdate::Failed(message.to_string()));
                }
            }),
        )
    }

    /// Replaces title and content of an existing post.
    ///
    /// # Errors
    /// `Invalid` if the draft fails validation, `Service` if the store
    /// rejects the write.
    pub async fn update_post(&self, id: &str, draft: &PostDraft) -> Result<(), PostError> {
        draft.validate()?;
        self.store
            .update_fields(POSTS_COLLECTION, id, edit_fields(&draft.title, &draft.content))
            .await?;
        info!(id, "Post updated");
        Ok(())
    }

    /// # Errors
    /// Returns the store error if the delete is rejected.
    pub async fn delete_post(&self, id: &str) -> Result<(), PostError> {
        self.store.delete(POSTS_COLLECTION, id).await?;
        info!(id, "Post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::POST_CREATE_ERROR;
    use crate::services::MemoryBackend;
    use crate::services::identity::IdentityService;
    use crate::validation::FormField;

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_store() {
        let backend = Arc::new(MemoryBackend::new());
        let posts = PostService::new(Arc::clone(&backend) as Arc<dyn DocumentStore>);
        backend.set_offline(true);

        let author = Identity::new("u", Some("u@x.io".to_string()));
        let err = posts
            .create_post(&PostDraft::new("   ", "content"), &author)
            .await
            .unwrap_err();

        let errors = match err {
            PostError::Invalid(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(errors.field(FormField::Title), Some("Title is required"));
    }

    #[tokio::test]
    async fn test_user_message_mapping() {
        let denied = PostError::Service(ServiceError::permission_denied("nope"));
        assert_eq!(denied.user_message(POST_CREATE_ERROR), PERMISSION_DENIED);

        let offline = PostError::Service(ServiceError::new(ServiceErrorKind::Timeout, "slow"));
        assert_eq!(offline.user_message(POST_CREATE_ERROR), NETWORK_ERROR);

        let other = PostError::Service(ServiceError::http_status(500, ""));
        assert_eq!(other.user_message(POST_CREATE_ERROR), POST_CREATE_ERROR);
    }

    #[tokio::test]
    async fn test_create_requires_sign_in() {
        let backend = Arc::new(MemoryBackend::new());
        let posts = PostService::new(Arc::clone(&backend) as Arc<dyn DocumentStore>);

        let stranger = Identity::new("nobody", None);
        let err = posts
            .create_post(&PostDraft::new("Hi", "there"), &stranger)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(POST_CREATE_ERROR), PERMISSION_DENIED);

        let me = backend.create_account("me@x.io", "secret1").await.unwrap();
        posts
            .create_post(&PostDraft::new("Hi", "there"), &me)
            .await
            .unwrap();
        assert_eq!(posts.get_posts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_live_failure_becomes_message() {
        let backend = Arc::new(MemoryBackend::new());
        let posts = PostService::new(Arc::clone(&backend) as Arc<dyn DocumentStore>);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let _sub = posts.subscribe_to_posts(Box::new(move |update| {
            let _ = tx.send(update);
        }));
        backend.fail_live_queries(&ServiceError::new(ServiceErrorKind::Network, "reset"));

        assert_eq!(rx.recv().await, Some(FeedUpdate::Posts(Vec::new())));
        assert_eq!(
            rx.recv().await,
            Some(FeedUpdate::Failed(NETWORK_ERROR.to_string()))
        );
    }
}
