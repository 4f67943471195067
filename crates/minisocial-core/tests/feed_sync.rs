//! Session, post client and live feed working together.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use minisocial_core::feed::{FeedPhase, FeedState};
use minisocial_core::post::Identity;
use minisocial_core::posts::{FeedUpdate, PostService};
use minisocial_core::services::MemoryBackend;
use minisocial_core::services::identity::IdentityService;
use minisocial_core::services::store::DocumentStore;
use minisocial_core::session::AuthSession;
use minisocial_core::subscription::Subscription;
use minisocial_core::validation::PostDraft;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::timeout;

struct Harness {
    backend: Arc<MemoryBackend>,
    session: AuthSession,
    posts: PostService,
}

async fn harness() -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let session = AuthSession::start(Arc::clone(&backend) as Arc<dyn IdentityService>);
    session.reader().wait_until_resolved().await;
    let posts = PostService::new(Arc::clone(&backend) as Arc<dyn DocumentStore>);
    Harness {
        backend,
        session,
        posts,
    }
}

async fn next(rx: &mut UnboundedReceiver<FeedUpdate>) -> FeedUpdate {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("feed delivery")
        .expect("feed open")
}

/// Registers `email` and waits until the session reports it.
async fn sign_up(h: &Harness, email: &str) -> Identity {
    let mut reader = h.session.reader();
    h.session.register(email, "secret1").await.unwrap();
    loop {
        let state = reader.snapshot();
        if let Some(identity) = state.identity
            && identity.email.as_deref() == Some(email)
        {
            return identity;
        }
        timeout(Duration::from_secs(2), reader.changed())
            .await
            .expect("session change")
            .expect("session open");
    }
}

fn subscribe(posts: &PostService) -> (Subscription, UnboundedReceiver<FeedUpdate>) {
    let (tx, rx) = unbounded_channel();
    let sub = posts.subscribe_to_posts(Box::new(move |update| {
        let _ = tx.send(update);
    }));
    (sub, rx)
}

#[tokio::test]
async fn test_created_post_arrives_through_live_feed() {
    let h = harness().await;
    let me = sign_up(&h, "alice@example.com").await;

    let (_sub, mut rx) = subscribe(&h.posts);
    let mut feed = FeedState::default();
    feed.begin_loading();
    feed.apply_update(next(&mut rx).await);
    assert_eq!(feed.phase, FeedPhase::Ready);
    assert!(feed.posts.is_empty());

    let before = Utc::now().timestamp_millis();
    let id = h
        .posts
        .create_post(&PostDraft::new("Hello", "World"), &me)
        .await
        .unwrap();

    // Nothing was inserted locally; the feed only changes on delivery.
    assert!(feed.posts.is_empty());

    feed.apply_update(next(&mut rx).await);
    let newest = &feed.posts[0];
    assert_eq!(newest.id, id);
    assert_eq!(newest.author_id, me.uid);
    assert_eq!(newest.author, "alice@example.com");
    assert_eq!(newest.title, "Hello");
    assert_eq!(newest.content, "World");
    assert!(newest.created_at.timestamp_millis() >= before);
}

#[tokio::test]
async fn test_feed_is_newest_first() {
    let h = harness().await;
    let me = sign_up(&h, "alice@example.com").await;

    for title in ["one", "two", "three"] {
        h.posts
            .create_post(&PostDraft::new(title, "body"), &me)
            .await
            .unwrap();
    }

    let titles: Vec<String> = h
        .posts
        .get_posts()
        .await
        .unwrap()
        .into_iter()
        .map(|post| post.title)
        .collect();
    assert_eq!(titles, ["three", "two", "one"]);
}

#[tokio::test]
async fn test_update_changes_only_content() {
    let h = harness().await;
    let me = sign_up(&h, "alice@example.com").await;

    let id = h
        .posts
        .create_post(&PostDraft::new("Hello", "World"), &me)
        .await
        .unwrap();
    let original = h.posts.get_posts().await.unwrap().remove(0);

    h.posts
        .update_post(&id, &PostDraft::new("Hello", "Everyone"))
        .await
        .unwrap();
    let updated = h.posts.get_posts().await.unwrap().remove(0);

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.author_id, original.author_id);
    assert_eq!(updated.author, original.author);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.title, original.title);
    assert_eq!(updated.content, "Everyone");
}

#[tokio::test]
async fn test_delete_reaches_every_subscriber() {
    let h = harness().await;
    let me = sign_up(&h, "alice@example.com").await;

    let keep = h
        .posts
        .create_post(&PostDraft::new("keep", "x"), &me)
        .await
        .unwrap();
    let doomed = h
        .posts
        .create_post(&PostDraft::new("doomed", "x"), &me)
        .await
        .unwrap();

    let (_first, mut rx1) = subscribe(&h.posts);
    let (_second, mut rx2) = subscribe(&h.posts);
    for rx in [&mut rx1, &mut rx2] {
        let FeedUpdate::Posts(posts) = next(rx).await else {
            panic!("expected initial feed");
        };
        assert_eq!(posts.len(), 2);
    }

    h.posts.delete_post(&doomed).await.unwrap();

    for rx in [&mut rx1, &mut rx2] {
        let FeedUpdate::Posts(posts) = next(rx).await else {
            panic!("expected feed after delete");
        };
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, [keep.as_str()]);
    }

    let fetched = h.posts.get_posts().await.unwrap();
    assert!(fetched.iter().all(|post| post.id != doomed));
}

#[tokio::test]
async fn test_other_users_cannot_edit_or_delete() {
    let h = harness().await;
    let alice = sign_up(&h, "alice@example.com").await;
    let id = h
        .posts
        .create_post(&PostDraft::new("mine", "x"), &alice)
        .await
        .unwrap();

    h.session.logout().await.unwrap();
    let bob = sign_up(&h, "bob@example.com").await;

    let post = h.posts.get_posts().await.unwrap().remove(0);
    assert!(post.is_owned_by(Some(&alice)));
    assert!(!post.is_owned_by(Some(&bob)));
    assert!(h.posts.delete_post(&id).await.is_err());
    assert!(
        h.posts
            .update_post(&id, &PostDraft::new("taken", "over"))
            .await
            .is_err()
    );
    assert_eq!(h.posts.get_posts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_disposed_subscription_stops_delivering() {
    let h = harness().await;
    let me = sign_up(&h, "alice@example.com").await;

    let (sub, mut rx) = subscribe(&h.posts);
    next(&mut rx).await;
    sub.dispose();
    sub.dispose();
    assert_eq!(h.backend.active_live_queries(), 0);

    h.posts
        .create_post(&PostDraft::new("late", "x"), &me)
        .await
        .unwrap();
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
}
