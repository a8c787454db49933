//! Config module - keepsync.toml.
//!
//! ```toml
//! [credentials]
//! username = "me@example.com"
//! password = "app-password"
//!
//! [paths]
//! notes_root = "~/notes"
//! ```

use crate::error::KeepError;
use crate::remote::auth::derive_android_id;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config location.
pub const CONFIG_ENV: &str = "KEEPSYNC_CONFIG";

const CONFIG_FILE_NAME: &str = "keepsync.toml";

/// Google account credentials
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
}

/// Local paths
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathsConfig {
    /// Flat directory holding one file per note or list
    pub notes_root: PathBuf,
}

/// Device identity presented to the auth endpoint
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeviceConfig {
    /// 16 hex digits; derived from the username when absent
    #[serde(default)]
    pub android_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub credentials: CredentialsConfig,

    pub paths: PathsConfig,

    #[serde(default)]
    pub device: DeviceConfig,
}

/// Default config directory (~/.config/keepsync/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("keepsync"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

/// Where to look for the config: `$KEEPSYNC_CONFIG`, then `./keepsync.toml`,
/// then the user config directory.
pub fn locate_config() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    default_config_path()
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

impl Config {
    pub fn new(username: &str, password: &str, notes_root: impl Into<PathBuf>) -> Self {
        Self {
            credentials: CredentialsConfig {
                username: username.to_string(),
                password: password.to_string(),
            },
            paths: PathsConfig {
                notes_root: notes_root.into(),
            },
            device: DeviceConfig::default(),
        }
    }

    /// Load and validate config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))
    }

    /// Parse and validate config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.paths.notes_root = expand_home(&config.paths.notes_root);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.credentials.username.trim().is_empty() {
            return Err(KeepError::Config("credentials.username is empty".to_string()).into());
        }
        if self.paths.notes_root.as_os_str().is_empty() {
            return Err(KeepError::Config("paths.notes_root is empty".to_string()).into());
        }
        if let Some(id) = &self.device.android_id {
            if id.len() != 16 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(KeepError::Config(format!(
                    "device.android_id must be 16 hex digits, got {:?}",
                    id
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn password(&self) -> &str {
        &self.credentials.password
    }

    pub fn notes_root(&self) -> &Path {
        &self.paths.notes_root
    }

    pub fn android_id(&self) -> String {
        self.device
            .android_id
            .clone()
            .unwrap_or_else(|| derive_android_id(&self.credentials.username))
    }
}
