use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/chat";
pub const DEFAULT_TENANT_ID: &str = "default-tenant";

const BASE_URL_ENV: &str = "CHATQ_BASE_URL";
const TENANT_ID_ENV: &str = "CHATQ_TENANT_ID";

/// Connection settings for the chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub tenant_id: String,
    /// Upper bound for a whole exchange, body included. Matches the
    /// backend's emitter timeout.
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Sent with each question so a handoff can reach the user.
    pub user_email: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            user_email: None,
        }
    }
}

impl ClientConfig {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            Error::Configuration("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("chatq").join("config.toml"))
    }

    /// Load from the default location with environment overrides applied.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from `path`, or return defaults if the file is missing or
    /// cannot be parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config file at {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Apply `CHATQ_BASE_URL` / `CHATQ_TENANT_ID` from `lookup`. Blank
    /// values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_blank(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(tenant_id) = non_blank(TENANT_ID_ENV) {
            self.tenant_id = tenant_id;
        }
    }
}
