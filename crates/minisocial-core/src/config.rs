//! Configuration management for Mini Social.
//!
//! Loads configuration from ${MINISOCIAL_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Which backend serves accounts and posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Firebase Auth + Realtime Database over HTTPS.
    #[default]
    Firebase,
    /// In-process sandbox. Accounts and posts vanish on exit.
    Memory,
}

/// Firebase project settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    /// Web API key.
    pub api_key: Option<String>,
    /// Realtime Database root URL.
    pub database_url: Option<String>,
    /// Identity Toolkit base URL override.
    pub auth_base_url: Option<String>,
    /// Secure Token base URL override.
    pub token_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Persist the refresh token so the next launch starts signed in.
    pub persist_session: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            persist_session: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds (0 disables)
    pub request_timeout_secs: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: Config::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Seconds a feed banner stays visible.
    pub banner_secs: u32,
    /// strftime pattern for post timestamps.
    pub time_format: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            banner_secs: Config::DEFAULT_BANNER_SECS,
            time_format: Config::DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Log file path; defaults to `<home>/logs/minisocial.log`.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub firebase: FirebaseConfig,
    pub auth: AuthConfig,
    pub network: NetworkConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for Mini Social configuration and data.
    //!
    //! MINISOCIAL_HOME resolution order:
    //! 1. MINISOCIAL_HOME environment variable (if set)
    //! 2. ~/.config/minisocial (default)

    use std::path::PathBuf;

    pub const HOME_ENV: &str = "MINISOCIAL_HOME";

    /// Returns the Mini Social home directory.
    pub fn minisocial_home() -> PathBuf {
        if let Ok(home) = std::env::var(HOME_ENV) {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("minisocial")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        minisocial_home().join("config.toml")
    }

    /// Returns the path of the persisted sign-in session.
    pub fn session_path() -> PathBuf {
        minisocial_home().join("session.json")
    }

    /// Returns the directory holding log files.
    pub fn logs_dir() -> PathBuf {
        minisocial_home().join("logs")
    }
}

impl Config {
    const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 30;
    const DEFAULT_BANNER_SECS: u32 = 5;
    const DEFAULT_TIME_FORMAT: &str = "%b %-d, %Y, %-I:%M %p";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.network.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(
                self.network.request_timeout_secs,
            )))
        }
    }

    /// How long feed banners stay on screen. Zero keeps them until replaced.
    pub fn banner_duration(&self) -> Option<Duration> {
        (self.ui.banner_secs > 0).then(|| Duration::from_secs(u64::from(self.ui.banner_secs)))
    }

    /// Returns the log file path, preferring the configured one.
    pub fn log_file(&self) -> PathBuf {
        match self.logging.file.as_deref().map(str::trim) {
            Some(file) if !file.is_empty() => PathBuf::from(file),
            _ => paths::logs_dir().join("minisocial.log"),
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Uses the embedded template for structure/comments and merges
    /// generated values from `Config::default()` into it.
    ///
    /// # Errors
    /// Returns an error if the template or the generated values fail to parse.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;

        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
