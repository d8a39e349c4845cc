//! Runtime configuration.
//!
//! Read from `<config dir>/notevault/config.json`, then overridden by
//! environment variables:
//! - `NOTEVAULT_DATA_DIR` - directory holding `notevault.db`
//! - `NOTEVAULT_PORT` - HTTP port for `serve`
//! - `NOTEVAULT_AUTOSAVE_SECS` - autosave interval in seconds

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::autosave;

const APP_NAME: &str = "notevault";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_PORT: u16 = 17020;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for the database. Defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub autosave_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            port: DEFAULT_PORT,
            autosave_secs: autosave::DEFAULT_PERIOD.as_secs(),
        }
    }
}

impl Config {
    /// Load the config file and apply environment overrides.
    /// Falls back to defaults if the file doesn't exist or fails to parse.
    pub fn load() -> Self {
        let config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config file")
    }

    /// Apply overrides looked up through `var`. Unparseable values are ignored.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = var("NOTEVAULT_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(port) = var("NOTEVAULT_PORT").and_then(|s| s.parse().ok()) {
            self.port = port;
        }
        if let Some(secs) = var("NOTEVAULT_AUTOSAVE_SECS").and_then(|s| s.parse().ok()) {
            self.autosave_secs = secs;
        }
        self
    }

    pub fn autosave_period(&self) -> Duration {
        Duration::from_secs(self.autosave_secs.max(1))
    }

    /// Path of the database file.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.join("notevault.db")),
            None => crate::db::default_path(),
        }
    }

    /// Save the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port, 17020);
        assert_eq!(config.autosave_period(), Duration::from_secs(3));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_json(r#"{"port": 8080}"#).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.autosave_secs, 3);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("NOTEVAULT_PORT", "9000"),
            ("NOTEVAULT_AUTOSAVE_SECS", "not-a-number"),
            ("NOTEVAULT_DATA_DIR", "/tmp/notes"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().with_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, 9000);
        assert_eq!(config.autosave_secs, 3);
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/notes/notevault.db")
        );
    }

    #[test]
    fn zero_autosave_is_clamped() {
        let config = Config {
            autosave_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.autosave_period(), Duration::from_secs(1));
    }
}
