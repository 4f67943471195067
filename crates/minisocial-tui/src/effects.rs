//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O and task spawning only. Tasks are created with
//! `task: None`; the reducer assigns ids before handing effects over.

use minisocial_core::post::Identity;
use minisocial_core::validation::PostDraft;

use crate::common::TaskId;
use crate::features::home::FeedSubId;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEffect {
    Quit,

    /// Open the live feed; deliveries come back tagged with `sub`.
    OpenFeed { sub: FeedSubId },
    /// Dispose the live feed.
    CloseFeed,
    /// One-shot fetch (manual refresh).
    RefreshFeed { task: Option<TaskId> },

    Login {
        task: Option<TaskId>,
        email: String,
        password: String,
    },
    Register {
        task: Option<TaskId>,
        email: String,
        password: String,
    },
    Logout { task: Option<TaskId> },

    CreatePost {
        task: Option<TaskId>,
        draft: PostDraft,
        author: Identity,
    },
    UpdatePost {
        task: Option<TaskId>,
        id: String,
        draft: PostDraft,
    },
    DeletePost { task: Option<TaskId>, id: String },
}

impl UiEffect {
    /// Slot for the task id, if this effect runs as a task.
    pub(crate) fn task_slot(&mut self) -> Option<&mut Option<TaskId>> {
        match self {
            UiEffect::RefreshFeed { task }
            | UiEffect::Login { task, .. }
            | UiEffect::Register { task, .. }
            | UiEffect::Logout { task }
            | UiEffect::CreatePost { task, .. }
            | UiEffect::UpdatePost { task, .. }
            | UiEffect::DeletePost { task, .. } => Some(task),
            UiEffect::Quit | UiEffect::OpenFeed { .. } | UiEffect::CloseFeed => None,
        }
    }
}
