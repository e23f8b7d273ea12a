//! Configuration schema for datamcp
//!
//! Configuration is stored at `~/.config/datamcp/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// External data tool settings
    pub tool: ToolConfig,

    /// Derived-artifact cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// External data tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Binary name or absolute path of the data tool
    pub binary: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("qsv"),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable conversion and profile caching (default: true)
    pub enabled: bool,

    /// Maximum total size of converted artifacts in bytes
    pub converted_max_bytes: u64,

    /// Maximum estimated size of the profile document in bytes
    pub profile_max_bytes: u64,

    /// Profile entries older than this many seconds are expired
    pub profile_ttl_secs: u64,
}

impl CacheConfig {
    /// Profile TTL as a `Duration`
    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            converted_max_bytes: 1024 * 1024 * 1024,
            profile_max_bytes: 10 * 1024 * 1024,
            profile_ttl_secs: 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tool.binary, PathBuf::from("qsv"));
        assert_eq!(config.cache.profile_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            profile_ttl_secs = 30
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.profile_ttl_secs, 30);
        assert_eq!(config.cache.converted_max_bytes, 1024 * 1024 * 1024); // default preserved
        assert!(config.cache.enabled);
    }
}
