//! Plain-text feed output.

use std::io::{Write, stdout};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use minisocial_core::config::Config;
use minisocial_core::interrupt::{self, InterruptedError};
use minisocial_core::messages::{EMPTY_FEED_HINT, EMPTY_FEED_TITLE, POST_LOAD_ERROR};
use minisocial_core::post::Post;
use minisocial_core::posts::{FeedUpdate, PostService};
use minisocial_core::services::Backend;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(config: &Config, local: bool, watch: bool, limit: Option<usize>) -> Result<()> {
    let backend = Backend::from_config(config, local)?;
    backend.restore_session().await;
    let posts = PostService::new(Arc::clone(&backend.store));
    let time_format = config.ui.time_format.as_str();

    if !watch {
        let feed = posts
            .get_posts()
            .await
            .map_err(|e| anyhow!("{}", e.user_message(POST_LOAD_ERROR)))
            .context("fetch posts")?;
        return print_feed(&feed, limit, time_format);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = posts.subscribe_to_posts(Box::new(move |update| {
        let _ = tx.send(update);
    }));
    info!("Watching feed");

    let result = loop {
        tokio::select! {
            () = interrupt::wait_for_interrupt() => break Err(InterruptedError.into()),
            update = rx.recv() => match update {
                Some(FeedUpdate::Posts(feed)) => {
                    print_feed(&feed, limit, time_format)?;
                    println!("---");
                }
                Some(FeedUpdate::Failed(message)) => break Err(anyhow!(message)),
                None => break Ok(()),
            },
        }
    };
    subscription.dispose();
    result
}

fn print_feed(feed: &[Post], limit: Option<usize>, time_format: &str) -> Result<()> {
    let mut out = stdout().lock();
    if feed.is_empty() {
        writeln!(out, "{EMPTY_FEED_TITLE}")?;
        writeln!(out, "{EMPTY_FEED_HINT}")?;
        return Ok(());
    }

    let shown = limit.unwrap_or(feed.len());
    for post in feed.iter().take(shown) {
        writeln!(out, "{}", format_post(post, time_format))?;
    }
    out.flush()?;
    Ok(())
}

fn format_post(post: &Post, time_format: &str) -> String {
    format!(
        "{}\nBy {} • {}\n{}\n",
        post.title,
        post.author,
        post.formatted_date(time_format),
        post.content
    )
}
