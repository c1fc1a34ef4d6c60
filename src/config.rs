//! Configuration management for word_search
//!
//! Supports loading configuration from TOML files with CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pool::task_pool::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use crate::pool::PoolConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Server-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[serde(default = "default_address")]
    pub address: String,
}

/// Scanner-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Directory to index
    #[serde(default = "default_path")]
    pub path: String,

    /// Time between rescans, in humantime format ("1h", "15m", "30s")
    #[serde(default = "default_rescan_interval")]
    pub rescan_interval: String,

    /// Number of tokenizer worker threads (must be at least 1)
    #[serde(default = "default_workers")]
    pub workers: i64,

    /// Capacity of the tokenizer task queue (0 = direct hand-off)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: i64,
}

fn default_address() -> String {
    "127.0.0.1:3333".to_string()
}

fn default_path() -> String {
    ".".to_string()
}

fn default_rescan_interval() -> String {
    "1h".to_string()
}

fn default_workers() -> i64 {
    DEFAULT_WORKERS
}

fn default_queue_capacity() -> i64 {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            rescan_interval: default_rescan_interval(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl ScannerConfig {
    /// Parsed rescan interval. Zero is rejected since it would rescan in a
    /// tight loop.
    pub fn rescan_interval(&self) -> Result<Duration> {
        let interval = humantime::parse_duration(&self.rescan_interval)
            .with_context(|| format!("Invalid rescan interval: {:?}", self.rescan_interval))?;
        if interval.is_zero() {
            anyhow::bail!("Rescan interval must be greater than zero");
        }
        Ok(interval)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from default locations
    ///
    /// Search order:
    /// 1. WORD_SEARCH_CONFIG environment variable
    /// 2. ./word_search.toml (current directory)
    /// 3. ~/.config/word_search/config.toml (user config)
    pub fn from_default_locations() -> Result<Option<(Self, PathBuf)>> {
        if let Ok(env_path) = std::env::var("WORD_SEARCH_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                let config = Self::from_file(&path)?;
                return Ok(Some((config, path)));
            }
        }

        let local_path = PathBuf::from("word_search.toml");
        if local_path.exists() {
            let config = Self::from_file(&local_path)?;
            return Ok(Some((config, local_path)));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("word_search").join("config.toml");
            if user_path.exists() {
                let config = Self::from_file(&user_path)?;
                return Ok(Some((config, user_path)));
            }
        }

        Ok(None)
    }

    /// Generate a template configuration file
    pub fn generate_template() -> String {
        r#"# Word Search Configuration
# Generated template - customize as needed

[server]
# Address to bind the HTTP server to
address = "127.0.0.1:3333"

[scanner]
# Directory to index
path = "."

# Time between full rescans (humantime format: "1h", "15m", "30s")
rescan_interval = "1h"

# Number of tokenizer worker threads (must be at least 1)
workers = 100

# Capacity of the tokenizer task queue; the directory walker blocks when it is full
# 0 hands every line directly to an idle worker
queue_capacity = 100
"#
        .to_string()
    }

    /// Write template config to the specified path
    pub fn write_template(path: &Path) -> Result<()> {
        let template = Self::generate_template();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, template)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Merge CLI overrides into the configuration
    pub fn with_overrides(
        mut self,
        address: Option<String>,
        path: Option<String>,
        rescan_interval: Option<String>,
    ) -> Self {
        if let Some(addr) = address {
            self.server.address = addr;
        }
        if let Some(path) = path {
            self.scanner.path = path;
        }
        if let Some(interval) = rescan_interval {
            self.scanner.rescan_interval = interval;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:3333");
        assert_eq!(config.scanner.path, ".");
        assert_eq!(
            config.scanner.rescan_interval().unwrap(),
            Duration::from_secs(3600)
        );
        assert_eq!(config.scanner.pool_config(), PoolConfig::default());
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[server]
address = "0.0.0.0:8080"

[scanner]
path = "/srv/docs"
rescan_interval = "15m"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.scanner.path, "/srv/docs");
        assert_eq!(
            config.scanner.rescan_interval().unwrap(),
            Duration::from_secs(15 * 60)
        );
        assert_eq!(config.scanner.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_negative_pool_values_survive_parsing() {
        let toml = r#"
[scanner]
workers = 0
queue_capacity = -1
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let pool = config.scanner.pool_config();
        assert_eq!(pool.workers, 0);
        assert_eq!(pool.queue_capacity, -1);
        assert!(crate::pool::TaskPool::from_config(pool).is_err());
    }

    #[test]
    fn test_invalid_interval() {
        let mut config = ScannerConfig::default();
        config.rescan_interval = "soon".to_string();
        assert!(config.rescan_interval().is_err());
        config.rescan_interval = "0s".to_string();
        assert!(config.rescan_interval().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(
            Some("127.0.0.1:9000".to_string()),
            Some("/data".to_string()),
            None,
        );
        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.scanner.path, "/data");
        assert_eq!(config.scanner.rescan_interval, "1h");
    }

    #[test]
    fn test_template_parses() {
        let template = Config::generate_template();
        let config: Config = toml::from_str(&template).unwrap();
        assert_eq!(config.scanner.queue_capacity, 100);
    }
}
