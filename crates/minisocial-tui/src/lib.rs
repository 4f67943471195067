//! Full-screen terminal client for Mini Social.

pub mod common;
pub mod effects;
pub mod events;
pub mod features;
pub mod mutations;
pub mod overlays;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};

use anyhow::Result;
pub use features::{auth, home};
use minisocial_core::config::Config;
use minisocial_core::routes::Route;
use minisocial_core::services::Backend;
pub use runtime::TuiRuntime;

/// Runs the interactive client starting at `initial`.
///
/// # Errors
/// Returns an error if stdout is not a terminal or the terminal fails.
pub fn run(config: Config, backend: Backend, initial: Route) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "The interactive client requires a terminal.\n\
             Use `minisocial feed` for non-interactive output."
        );
    }

    let mut runtime = TuiRuntime::new(config, backend, initial)?;
    runtime.run()
}
