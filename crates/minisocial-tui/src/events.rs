//! UI event types.
//!
//! All external inputs (terminal, session, feed deliveries, task results)
//! are converted to `UiEvent` before being processed by the reducer.
//!
//! ## Task Lifecycle Events
//!
//! Async work uses a uniform lifecycle:
//! - The runtime emits `UiEvent::TaskStarted` once a task is spawned
//! - The runtime emits `UiEvent::TaskCompleted` with the result event when done
//! - The reducer is the only place that mutates `TaskState`

use crossterm::event::Event as CrosstermEvent;
use minisocial_core::post::Post;
use minisocial_core::posts::{FeedUpdate, PostError};
use minisocial_core::session::SessionState;

use crate::common::{TaskCompleted, TaskKind, TaskStarted};
use crate::features::home::FeedSubId;

#[derive(Debug)]
pub enum UiEvent {
    /// Periodic tick (spinner, banner expiry, render cadence).
    Tick,
    Terminal(CrosstermEvent),

    /// The auth session changed.
    Session(SessionState),

    /// Live feed delivery, tagged with the subscription that produced it.
    Feed { sub: FeedSubId, update: FeedUpdate },

    TaskStarted {
        kind: TaskKind,
        started: TaskStarted,
    },
    TaskCompleted {
        kind: TaskKind,
        completed: TaskCompleted<Box<UiEvent>>,
    },

    // Task results. Delivered wrapped in `TaskCompleted`.
    LoginFinished(Result<(), String>),
    RegisterFinished(Result<(), String>),
    LogoutFinished(Result<(), String>),
    PostCreated(Result<String, PostError>),
    PostUpdated(Result<(), PostError>),
    PostDeleted(Result<(), PostError>),
    FeedFetched(Result<Vec<Post>, PostError>),
}
