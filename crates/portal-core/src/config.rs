//! Application configuration management.
//!
//! Configuration is stored at `~/.config/officials-portal/config.json`.
//! Environment variables win over the file:
//!
//! - `PORTAL_API_URL`: base URL of the portal functions
//! - `PORTAL_USE_MOCK_DATA`: `true` to serve member fixtures when offline

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ClientConfig, DEFAULT_BASE_URL};
use crate::cache::CachePolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "officials-portal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Subdirectory of the cache dir holding response cache entries.
const RESPONSES_DIR: &str = "responses";

pub const ENV_API_URL: &str = "PORTAL_API_URL";
pub const ENV_USE_MOCK_DATA: &str = "PORTAL_USE_MOCK_DATA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub use_mock_data: bool,
    /// Upper bound on the response cache's size on disk.
    pub cache_quota_bytes: Option<u64>,
    /// Resource key to TTL in milliseconds, on top of the built-in table.
    pub ttl_overrides_ms: BTreeMap<String, u64>,
    pub last_email: Option<String>,
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Overlay values from `lookup` (the process environment in `load`).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(flag) = lookup(ENV_USE_MOCK_DATA) {
            self.use_mock_data = matches!(flag.trim().to_ascii_lowercase().as_str(), "true" | "1");
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Session file, logs and the response cache live under here.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn base_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.ttl_overrides_ms
            .iter()
            .fold(CachePolicy::default(), |policy, (key, ms)| {
                policy.with_ttl(key.clone(), Duration::from_millis(*ms))
            })
    }

    /// Everything the API client needs, with the response cache on disk.
    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(self.client_config_in(self.cache_dir()?))
    }

    fn client_config_in(&self, cache_dir: PathBuf) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url().to_string(),
            cache_policy: self.cache_policy(),
            use_mock_data: self.use_mock_data,
            cache_dir: Some(cache_dir.join(RESPONSES_DIR)),
            cache_quota_bytes: self.cache_quota_bytes,
            ..ClientConfig::default()
        }
    }
}
