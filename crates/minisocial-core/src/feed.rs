//! Feed view state: `Idle -> Loading -> {Ready, Error}`.

use crate::messages::POST_LOAD_ERROR;
use crate::post::Post;
use crate::posts::{FeedUpdate, PostError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub phase: FeedPhase,
    /// Newest first. Kept on error so the last good feed stays visible.
    pub posts: Vec<Post>,
    pub error: Option<String>,
}

impl FeedState {
    pub fn is_loading(&self) -> bool {
        self.phase == FeedPhase::Loading
    }

    /// Entered when the feed view mounts.
    pub fn begin_loading(&mut self) {
        self.phase = FeedPhase::Loading;
        self.error = None;
    }

    /// Replaces the whole sequence with a live delivery.
    pub fn apply_delivery(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.phase = FeedPhase::Ready;
        self.error = None;
    }

    /// Applies the result of a one-shot fetch.
    pub fn apply_fetch(&mut self, result: Result<Vec<Post>, PostError>) {
        match result {
            Ok(posts) => self.apply_delivery(posts),
            Err(err) => {
                self.phase = FeedPhase::Error;
                self.error = Some(err.user_message(POST_LOAD_ERROR));
            }
        }
    }

    /// The live query stopped. Posts already shown are kept.
    pub fn apply_live_failure(&mut self, message: impl Into<String>) {
        self.phase = FeedPhase::Error;
        self.error = Some(message.into());
    }

    pub fn apply_update(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Posts(posts) => self.apply_delivery(posts),
            FeedUpdate::Failed(message) => self.apply_live_failure(message),
        }
    }
}
