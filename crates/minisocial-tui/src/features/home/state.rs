use minisocial_core::feed::FeedState;
use minisocial_core::post::Post;
use minisocial_core::validation::{FormErrors, PostDraft};

use crate::common::TextField;

/// Tag for one live feed subscription.
pub type FeedSubId = u64;

/// Tracks which feed subscription is current. Deliveries from any other
/// subscription are stale and dropped.
#[derive(Debug, Default)]
pub struct FeedSubscription {
    active: Option<FeedSubId>,
    next: FeedSubId,
    /// uid the subscription was opened under.
    owner: Option<String>,
}

impl FeedSubscription {
    pub fn active(&self) -> Option<FeedSubId> {
        self.active
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn open(&mut self, owner: Option<&str>) -> FeedSubId {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        self.active = Some(id);
        self.owner = owner.map(str::to_string);
        id
    }

    /// Returns `true` if a subscription was open.
    pub fn close(&mut self) -> bool {
        self.owner = None;
        self.active.take().is_some()
    }

    pub fn accepts(&self, sub: FeedSubId) -> bool {
        self.active == Some(sub)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeField {
    Title,
    Content,
}

/// "Create a New Post" form.
#[derive(Debug, Clone)]
pub struct ComposeState {
    pub title: TextField,
    pub content: TextField,
    /// `None` while browsing the feed.
    pub focus: Option<ComposeField>,
    pub errors: FormErrors,
}

impl Default for ComposeState {
    fn default() -> Self {
        Self {
            title: TextField::new(),
            content: TextField::multiline(),
            focus: None,
            errors: FormErrors::default(),
        }
    }
}

impl ComposeState {
    pub fn draft(&self) -> PostDraft {
        PostDraft::new(self.title.value.clone(), self.content.value.clone())
    }

    pub fn focused_mut(&mut self) -> Option<&mut TextField> {
        match self.focus? {
            ComposeField::Title => Some(&mut self.title),
            ComposeField::Content => Some(&mut self.content),
        }
    }

    /// Empties both fields and the errors, keeping focus.
    pub fn clear(&mut self) {
        self.title.clear();
        self.content.clear();
        self.errors = FormErrors::default();
    }
}

#[derive(Debug, Default)]
pub struct HomeState {
    pub feed: FeedState,
    pub subscription: FeedSubscription,
    /// Index of the highlighted post.
    pub selected: usize,
    pub compose: ComposeState,
}

impl HomeState {
    pub fn selected_post(&self) -> Option<&Post> {
        self.feed.posts.get(self.selected)
    }

    pub fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.feed.posts.len().saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.feed.posts.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_tags_are_unique() {
        let mut sub = FeedSubscription::default();
        let first = sub.open(None);
        assert!(sub.accepts(first));

        assert!(sub.close());
        assert!(!sub.close());
        assert!(!sub.accepts(first));

        let second = sub.open(Some("uid-1"));
        assert_ne!(first, second);
        assert!(!sub.accepts(first));
        assert_eq!(sub.owner(), Some("uid-1"));
    }
}
