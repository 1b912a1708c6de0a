//! Application configuration management.
//!
//! Stored at `~/.config/pareview/config.json` (platform config dir). The
//! persisted session and the offline cache live under the platform cache
//! dir instead, see [`Config::data_dir`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{normalize_base_url, DEFAULT_BASE_URL, DEFAULT_KLINE_PAGE_SIZE};
use crate::models::Period;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "pareview";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides `api_base_url` when set.
pub const BASE_URL_ENV: &str = "PAREVIEW_API_BASE_URL";

fn default_kline_page_size() -> u32 {
    DEFAULT_KLINE_PAGE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub last_username: Option<String>,
    #[serde(default)]
    pub default_period: Period,
    #[serde(default = "default_kline_page_size")]
    pub kline_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            last_username: None,
            default_period: Period::default(),
            kline_page_size: DEFAULT_KLINE_PAGE_SIZE,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Read a config file; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the session file and the list cache are kept.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend address: `PAREVIEW_API_BASE_URL`, then the config file, then
    /// the built-in default.
    pub fn base_url(&self) -> Result<String> {
        let env = std::env::var(BASE_URL_ENV).ok();
        self.resolve_base_url(env.as_deref())
    }

    pub fn resolve_base_url(&self, env_override: Option<&str>) -> Result<String> {
        let raw = env_override
            .filter(|v| !v.trim().is_empty())
            .or(self.api_base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL);
        Ok(normalize_base_url(raw)?)
    }
}
