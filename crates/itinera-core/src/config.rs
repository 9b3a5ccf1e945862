// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::viewport::ViewportOptions;
use crate::ItineraError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItineraConfig {
    pub api_base_url: String,
    pub generate_path: String,
    pub geocode_path: String,
    pub polylines_path: String,
    pub timeout_secs: u64,
    /// Append `", <destination>"` to geocode queries.
    pub disambiguate_queries: bool,
    pub viewport: ViewportOptions,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Default for ItineraConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            generate_path: "/api/generate_itinerary".to_string(),
            geocode_path: "/api/geocode".to_string(),
            polylines_path: "/api/polylines".to_string(),
            timeout_secs: 30,
            disambiguate_queries: true,
            viewport: ViewportOptions::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ItineraConfig {
    pub fn validate(&self) -> Result<(), ItineraError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ItineraError::Config(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ItineraError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(crate::get_config_root().join("config.json"))
    }
}

impl ConfigManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Missing file means defaults.
    pub fn load(&self) -> Result<ItineraConfig> {
        if !self.config_path.exists() {
            return Ok(ItineraConfig::default());
        }

        let content = fs::read_to_string(&self.config_path).context("Failed to read config.json")?;
        let config: ItineraConfig =
            serde_json::from_str(&content).context("Failed to parse config.json")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &ItineraConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, content).context("Failed to write config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("nope.json"));
        assert_eq!(manager.load().unwrap(), ItineraConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("nested").join("config.json"));

        let mut config = ItineraConfig::default();
        config.api_base_url = "https://trips.example.org".to_string();
        config.viewport.fallback_center = LatLng::new(35.68, 139.76);
        manager.save(&config).unwrap();

        assert_eq!(manager.load().unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"timeout_secs": 5, "viewport": {"padding": 10}}"#).unwrap();

        let config = ConfigManager::new(&path).load().unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.viewport.padding, 10);
        assert_eq!(config.viewport.single_point_zoom, 13.0);
        assert_eq!(config.geocode_path, "/api/geocode");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_base_url": "ftp://nope"}"#).unwrap();
        assert!(ConfigManager::new(&path).load().is_err());

        fs::write(&path, "{ not json").unwrap();
        assert!(ConfigManager::new(&path).load().is_err());
    }
}
