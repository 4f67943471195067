//! Home screen: compose form and the live feed.

mod render;
mod state;
mod update;

pub use render::{HomeView, render_home};
pub use state::{ComposeField, ComposeState, FeedSubId, FeedSubscription, HomeState};
pub use update::{
    HomeContext, handle_create_result, handle_delete_result, handle_feed_update,
    handle_fetch_result, handle_home_key, handle_home_paste, sync_feed,
};
