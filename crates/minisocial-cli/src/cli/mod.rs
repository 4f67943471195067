//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use minisocial_core::config::Config;
use minisocial_core::interrupt;
use minisocial_core::routes::Route;

mod commands;

#[derive(Parser)]
#[command(name = "minisocial")]
#[command(version)]
#[command(about = "Mini Social terminal client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Screen to open first (e.g. /, /login, /register)
    #[arg(long, value_name = "PATH", default_value = "/")]
    route: String,

    /// Use the ephemeral in-memory backend instead of the configured one
    #[arg(long, global = true)]
    local: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the post feed, newest first
    Feed {
        /// Keep listening and reprint the feed on every change
        #[arg(long)]
        watch: bool,

        /// Show at most this many posts
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from defaults
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        route,
        local,
    } = cli;

    match command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
        Some(Commands::Feed { watch, limit }) => {
            let config = Config::load().context("load config")?;
            let _log_guard = minisocial_core::logging::init(&config)?;
            commands::feed::run(&config, local, watch, limit).await
        }
        // default to the interactive client
        None => {
            let config = Config::load().context("load config")?;
            let _log_guard = minisocial_core::logging::init(&config)?;
            commands::tui::run(config, local, Route::parse(&route))
        }
    }
}
