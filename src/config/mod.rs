//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::{StoredToken, TokenStore};
use crate::models::Theme;

/// Backend used when the config file does not name one.
pub const DEFAULT_API_BASE: &str = "https://ai-ja3l.onrender.com";

/// Local port the OAuth callback listener binds to.
pub const DEFAULT_OAUTH_PORT: u16 = 5173;

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_oauth_port() -> u16 {
    DEFAULT_OAUTH_PORT
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the CogniDoc backend (no trailing slash)
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Port for the local OAuth redirect listener
    #[serde(default = "default_oauth_port")]
    pub oauth_port: u16,
    /// UI theme
    #[serde(default)]
    pub theme: Theme,
    /// Bearer credential from the last login
    pub token: Option<StoredToken>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            oauth_port: default_oauth_port(),
            theme: Theme::default(),
            token: None,
        }
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "cognidoc", "cognidoc")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the token)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}

impl TokenStore for Config {
    fn get_token(&self) -> Option<StoredToken> {
        self.token.clone()
    }

    fn set_token(&mut self, token: String) {
        self.token = Some(StoredToken::new(token));
    }

    fn clear_token(&mut self) {
        self.token = None;
    }
}
