//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prnotify.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRNOTIFY_ORGANIZATION`,
//!    `PRNOTIFY_GITHUB_TOKEN` (or legacy `GITHUB_TOKEN`), and friends
//! 4. **Command-line arguments** – `--organization`, `--github-token`, ...
//!
//! # Configuration File
//!
//! Place `.prnotify.toml` in the current directory, home directory, or XDG
//! config directory with:
//!
//! ```toml
//! organization = "acme"
//! github_token = "ghp_example"
//! slack_token = "xoxb-example"
//! slack_channel = "C0123456789"
//! database_url = "prnotify.sqlite"
//! poll_interval_secs = 180
//! ```

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default polling interval between light passes, in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 180;

/// Default GitHub API base URL.
const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration sources could not be read or merged.
    #[error("configuration error: {message}")]
    Load {
        /// Details about the configuration failure.
        message: String,
    },

    /// A required value is missing from every configuration source.
    #[error("{name} is required (use --{flag} or PRNOTIFY_{env})")]
    MissingValue {
        /// Human-readable name of the value.
        name: &'static str,
        /// CLI flag that supplies it.
        flag: &'static str,
        /// Environment variable suffix that supplies it.
        env: &'static str,
    },
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `PRNOTIFY_ORGANIZATION` or `--organization`: GitHub organization to poll
/// - `PRNOTIFY_GITHUB_TOKEN`, `GITHUB_TOKEN`, or `--github-token`: GitHub token
/// - `PRNOTIFY_SLACK_TOKEN` or `--slack-token`: Slack bot token
/// - `PRNOTIFY_SLACK_CHANNEL` or `--slack-channel`: destination channel id
/// - `PRNOTIFY_DATABASE_URL` or `--database-url`: local `SQLite` database path
/// - `PRNOTIFY_POLL_INTERVAL_SECS` or `--poll-interval-secs`: polling cadence
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRNOTIFY",
    discovery(
        dotfile_name = ".prnotify.toml",
        config_file_name = "prnotify.toml",
        app_name = "prnotify"
    )
)]
pub struct PrnotifyConfig {
    /// GitHub organization whose open pull requests are polled.
    #[ortho_config(cli_short = 'o')]
    pub organization: Option<String>,

    /// Personal access token for GitHub API authentication.
    ///
    /// Falls back to the legacy `GITHUB_TOKEN` environment variable when no
    /// other source provides a value.
    #[ortho_config(cli_short = 't')]
    pub github_token: Option<String>,

    /// Slack bot token used to post notifications.
    pub slack_token: Option<String>,

    /// Slack channel id that receives notifications.
    pub slack_channel: Option<String>,

    /// Local `SQLite` database URL/path used for persistence.
    ///
    /// Diesel uses a filesystem path for `SQLite` connections.
    pub database_url: Option<String>,

    /// Seconds between recurring light passes. Defaults to 180.
    pub poll_interval_secs: u64,

    /// GitHub API base URL, overridable for GitHub Enterprise installs.
    pub github_api_base: Option<String>,

    /// Slack API base URL, overridable for testing.
    pub slack_api_base: Option<String>,
}

impl Default for PrnotifyConfig {
    fn default() -> Self {
        Self {
            organization: None,
            github_token: None,
            slack_token: None,
            slack_channel: None,
            database_url: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            github_api_base: None,
            slack_api_base: None,
        }
    }
}

impl PrnotifyConfig {
    /// Returns the organization name or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] when no source provides one.
    pub fn require_organization(&self) -> Result<&str, ConfigError> {
        self.organization
            .as_deref()
            .ok_or(ConfigError::MissingValue {
                name: "organization",
                flag: "organization",
                env: "ORGANIZATION",
            })
    }

    /// Resolves the GitHub token from configuration or the legacy
    /// `GITHUB_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] when no token source provides a
    /// value.
    pub fn resolve_github_token(&self) -> Result<String, ConfigError> {
        self.github_token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or(ConfigError::MissingValue {
                name: "GitHub token",
                flag: "github-token",
                env: "GITHUB_TOKEN",
            })
    }

    /// Returns the Slack bot token or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] when no source provides one.
    pub fn require_slack_token(&self) -> Result<&str, ConfigError> {
        self.slack_token
            .as_deref()
            .ok_or(ConfigError::MissingValue {
                name: "Slack token",
                flag: "slack-token",
                env: "SLACK_TOKEN",
            })
    }

    /// Returns the Slack channel id or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] when no source provides one.
    pub fn require_slack_channel(&self) -> Result<&str, ConfigError> {
        self.slack_channel
            .as_deref()
            .ok_or(ConfigError::MissingValue {
                name: "Slack channel",
                flag: "slack-channel",
                env: "SLACK_CHANNEL",
            })
    }

    /// Returns the database URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] when no source provides one.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingValue {
                name: "database URL",
                flag: "database-url",
                env: "DATABASE_URL",
            })
    }

    /// Returns the polling interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the GitHub API base URL, defaulting to the public API.
    #[must_use]
    pub fn github_api_base(&self) -> &str {
        self.github_api_base
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_API_BASE)
    }

    /// Returns the Slack API base URL, defaulting to the public API.
    #[must_use]
    pub fn slack_api_base(&self) -> &str {
        self.slack_api_base
            .as_deref()
            .unwrap_or(crate::notify::DEFAULT_SLACK_API_BASE)
    }
}
