//! Effect handlers for the TUI runtime.
//!
//! Handlers are pure async functions that return a `UiEvent`. The runtime
//! spawns them and sends the result to the inbox; they never touch state.

pub mod auth;
pub mod posts;

pub use auth::*;
pub use posts::*;
