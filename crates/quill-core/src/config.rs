//! Configuration management for quill.
//!
//! Loads configuration from ${QUILL_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::Environment;

/// How post timestamps are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeDisplay {
    /// Host timezone and locale (default)
    #[default]
    Local,
    /// Stable `YYYY-MM-DD HH:MM UTC`
    Utc,
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for quill configuration and data directories.
    //!
    //! QUILL_HOME resolution order:
    //! 1. QUILL_HOME environment variable (if set)
    //! 2. ~/.config/quill (default)
    //! 3. ./.quill when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the quill home directory.
    pub fn quill_home() -> PathBuf {
        if let Ok(home) = std::env::var("QUILL_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".quill"),
            |h| h.join(".config").join("quill"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        quill_home().join("config.toml")
    }

    /// Returns the directory holding persisted client state.
    pub fn state_dir() -> PathBuf {
        quill_home()
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        quill_home().join("logs")
    }
}

/// API address configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address used inside the deployment network (server environment only).
    pub internal_base: Option<String>,
    /// Publicly routable address.
    pub public_base: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution environment: "client" or "server"
    pub environment: Environment,

    /// API addresses
    pub api: ApiConfig,

    /// Posts per page when listing
    pub page_size: u32,

    /// Timestamp rendering: "local" or "utc"
    pub time_display: TimeDisplay,
}

impl Config {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

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

    /// Page size to request, never zero.
    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            Self::DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    ///
    /// # Errors
    /// Returns an error if the file exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
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

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Client,
            api: ApiConfig::default(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            time_display: TimeDisplay::Local,
        }
    }
}
