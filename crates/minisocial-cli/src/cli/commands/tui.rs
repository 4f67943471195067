//! Interactive client.

use anyhow::Result;
use minisocial_core::config::Config;
use minisocial_core::routes::Route;
use minisocial_core::services::Backend;
use tracing::info;

pub fn run(config: Config, local: bool, initial: Route) -> Result<()> {
    let backend = Backend::from_config(&config, local)?;
    info!(route = initial.path(), "Starting interactive client");
    minisocial_tui::run(config, backend, initial)
}
