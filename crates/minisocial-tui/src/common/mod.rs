//! Helpers shared by features and overlays.

mod field;
mod task;
pub mod text;

pub use field::TextField;
pub use task::{TaskCompleted, TaskId, TaskKind, TaskSeq, TaskStarted, TaskState, Tasks};
pub use text::{truncate_start_with_ellipsis, truncate_with_ellipsis};
