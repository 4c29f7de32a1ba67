use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::transport::DEFAULT_ENDPOINT;

/// Environment variable that overrides the configured endpoint.
pub const ENDPOINT_ENV: &str = "HEALTHOSS_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Apply overrides in precedence order: `flag`, then `env`, then the
    /// value already loaded. Blank values are skipped.
    pub fn with_endpoint_override(mut self, flag: Option<&str>, env: Option<&str>) -> Self {
        let chosen = [flag, env]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty());

        if let Some(endpoint) = chosen {
            self.endpoint = endpoint.to_string();
        }
        self
    }

    /// Replace the stored endpoint. Rejects blank values.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(anyhow!("Endpoint must not be empty"));
        }
        self.endpoint = endpoint.to_string();
        Ok(self)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("healthoss").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:8080/chat");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            endpoint: "http://health.local:9000/chat".to_string(),
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_empty_object_uses_default_endpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_endpoint_override_precedence() {
        let base = Config::default();

        let config = base.clone().with_endpoint_override(Some("http://flag/chat"), Some("http://env/chat"));
        assert_eq!(config.endpoint, "http://flag/chat");

        let config = base.clone().with_endpoint_override(None, Some("http://env/chat"));
        assert_eq!(config.endpoint, "http://env/chat");

        let config = base.clone().with_endpoint_override(Some("  "), None);
        assert_eq!(config, base);
    }

    #[test]
    fn test_set_endpoint_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load_from(&path)
            .unwrap()
            .with_endpoint("  http://clinic.local/chat ")
            .unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.endpoint, "http://clinic.local/chat");
    }

    #[test]
    fn test_set_blank_endpoint_is_rejected() {
        let err = Config::default().with_endpoint("   ").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
