//! Client configuration.
//!
//! Values come from an optional JSON file and are overridden by environment
//! variables. Everything is normalized on load: text is trimmed, empty values
//! are dropped, and the remote URL must be http(s).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "readlist.db";
const APP_DIR_NAME: &str = "readlist";

pub const DB_PATH_ENV: &str = "READLIST_DB_PATH";
pub const REMOTE_URL_ENV: &str = "READLIST_REMOTE_URL";
pub const REMOTE_TOKEN_ENV: &str = "READLIST_REMOTE_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub remote_token: Option<String>,
}

/// Platform default location of the config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Platform default location of the database file
pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME).join(DB_FILE_NAME))
}

impl ClientConfig {
    /// Load the default config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match default_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!("failed to parse config at {}: {error}", path.display()))
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| Error::Config(format!("failed to serialize config: {error}")))?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = normalize_text_option(lookup(DB_PATH_ENV)) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(url) = normalize_text_option(lookup(REMOTE_URL_ENV)) {
            self.remote_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(REMOTE_TOKEN_ENV)) {
            self.remote_token = Some(token);
        }
        self.normalize();
    }

    /// Database path, falling back to the platform data directory
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        self.db_path
            .clone()
            .or_else(default_db_path)
            .ok_or_else(|| Error::Config("failed to resolve data directory".to_string()))
    }

    pub const fn has_remote(&self) -> bool {
        self.remote_url.is_some()
    }

    fn normalize(&mut self) {
        self.remote_url = normalize_text_option(self.remote_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.remote_token = normalize_text_option(self.remote_token.take());
        self.db_path = self
            .db_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }

    fn validate(&self) -> Result<()> {
        match &self.remote_url {
            Some(url) if !is_http_url(url) => Err(Error::Config(
                "remote_url must include http:// or https://".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
