use minisocial_core::post::Identity;
use minisocial_core::posts::PostService;
use minisocial_core::subscription::Subscription;
use minisocial_core::validation::PostDraft;

use crate::events::UiEvent;
use crate::features::home::FeedSubId;
use crate::runtime::inbox::UiEventSender;

pub async fn create_post(posts: PostService, draft: PostDraft, author: Identity) -> UiEvent {
    UiEvent::PostCreated(posts.create_post(&draft, &author).await)
}

pub async fn update_post(posts: PostService, id: String, draft: PostDraft) -> UiEvent {
    UiEvent::PostUpdated(posts.update_post(&id, &draft).await)
}

pub async fn delete_post(posts: PostService, id: String) -> UiEvent {
    UiEvent::PostDeleted(posts.delete_post(&id).await)
}

pub async fn fetch_posts(posts: PostService) -> UiEvent {
    UiEvent::FeedFetched(posts.get_posts().await)
}

/// Opens the live feed; every delivery lands in the inbox tagged with `sub`.
pub fn open_feed(posts: &PostService, sub: FeedSubId, tx: UiEventSender) -> Subscription {
    posts.subscribe_to_posts(Box::new(move |update| {
        let _ = tx.send(UiEvent::Feed { sub, update });
    }))
}
