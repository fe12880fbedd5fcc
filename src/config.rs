//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! currently holds the API base URL and the last used username.
//!
//! Configuration is stored at `~/.config/pharmatrack/config.json`. The base
//! URL can be overridden at runtime with the `PHARMATRACK_API_URL`
//! environment variable (a `.env` file is honored if present).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/session directory paths
const APP_NAME: &str = "pharmatrack";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the persisted API base URL
const API_URL_ENV: &str = "PHARMATRACK_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Pick up .env overrides if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolve the API base URL: the environment wins over the config file.
    pub fn resolve_api_url(&self) -> Result<String> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                return Ok(url);
            }
        }
        self.api_url.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No API base URL configured (set {} or api_url in config.json)",
                API_URL_ENV
            )
        })
    }

    /// Directory where the file-backed session storage keeps its entries.
    pub fn session_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join("session"))
    }
}
