//! Configuration management.
//!
//! This module handles loading the configuration, which includes
//! the catalog endpoint, cache policy and asset verification limits.
//!
//! Configuration is stored at `~/.config/templatecache/config.json`.
//! Selected values can be overridden from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::Language;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "templatecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Templates change rarely; a day keeps catalog traffic low.
const DEFAULT_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_url: String,
    pub api_key: Option<String>,
    pub catalog_table: String,
    pub translations_table: String,
    pub default_language: Language,
    pub ttl_minutes: i64,
    pub asset_version: String,
    pub verify_concurrency: usize,
    pub probe_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub verify_on_refresh: bool,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: "http://localhost:54321".to_string(),
            api_key: None,
            catalog_table: "habit_templates".to_string(),
            translations_table: "habit_template_translations".to_string(),
            default_language: Language::DEFAULT,
            ttl_minutes: DEFAULT_TTL_MINUTES,
            asset_version: "1".to_string(),
            verify_concurrency: 6,
            probe_timeout_secs: 8,
            request_timeout_secs: 30,
            verify_on_refresh: false,
            cache_dir: None,
        }
    }
}

/// Knobs the sync orchestrator runs with.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub ttl: chrono::Duration,
    pub default_language: Language,
    pub verify_concurrency: usize,
    pub probe_timeout: Duration,
    pub verify_on_refresh: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Config::default().sync_settings()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override values from `TEMPLATECACHE_*` variables.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("TEMPLATECACHE_CATALOG_URL") {
            self.catalog_url = url;
        }
        if let Some(key) = var("TEMPLATECACHE_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(version) = var("TEMPLATECACHE_ASSET_VERSION") {
            self.asset_version = version;
        }
        if let Some(dir) = var("TEMPLATECACHE_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            ttl: chrono::Duration::minutes(self.ttl_minutes.max(0)),
            default_language: self.default_language,
            verify_concurrency: self.verify_concurrency.max(1),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs.max(1)),
            verify_on_refresh: self.verify_on_refresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "catalog_url": "https://c.example.com", "ttl_minutes": 5 }"#)
                .unwrap();
        assert_eq!(config.catalog_url, "https://c.example.com");
        assert_eq!(config.ttl_minutes, 5);
        assert_eq!(config.verify_concurrency, 6);
        assert_eq!(config.default_language, Language::En);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "TEMPLATECACHE_ASSET_VERSION" => Some("9".to_string()),
            "TEMPLATECACHE_CACHE_DIR" => Some("/tmp/tc".to_string()),
            _ => None,
        });
        assert_eq!(config.asset_version, "9");
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/tc"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_sync_settings_clamps_limits() {
        let config = Config {
            verify_concurrency: 0,
            probe_timeout_secs: 0,
            ttl_minutes: 30,
            ..Config::default()
        };
        let settings = config.sync_settings();
        assert_eq!(settings.verify_concurrency, 1);
        assert_eq!(settings.probe_timeout, Duration::from_secs(1));
        assert_eq!(settings.ttl, chrono::Duration::minutes(30));
    }
}
