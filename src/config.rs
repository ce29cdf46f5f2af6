//! Router configuration
//!
//! Configuration is stored as human-readable JSON. Every field has a default,
//! so a partial file (or none at all) yields a usable configuration.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest queue a link may be configured with
const MAX_LINK_QUEUE_CAPACITY: usize = 1 << 20;

/// Router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Depth of each link's outbound queue before pushes report backpressure
    #[serde(default = "default_link_queue_capacity")]
    pub link_queue_capacity: usize,

    /// `tracing` filter directive for binaries embedding the router
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_link_queue_capacity() -> usize {
    256
}

fn default_log_filter() -> String {
    "busroute=info".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            link_queue_capacity: default_link_queue_capacity(),
            log_filter: default_log_filter(),
        }
    }
}

impl RouterConfig {
    /// Set the link queue capacity
    pub fn with_link_queue_capacity(mut self, capacity: usize) -> Self {
        self.link_queue_capacity = capacity;
        self
    }

    /// Set the log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Check every field holds a usable value
    pub fn validate(&self) -> Result<()> {
        if self.link_queue_capacity == 0 || self.link_queue_capacity > MAX_LINK_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "link_queue_capacity",
                reason: format!(
                    "{} is outside 1..={}",
                    self.link_queue_capacity, MAX_LINK_QUEUE_CAPACITY
                ),
            }
            .into());
        }

        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_filter",
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Save configuration to a JSON file, creating parent directories
///
/// # Example
///
/// ```no_run
/// use busroute::config::{save_config, RouterConfig};
/// use std::path::Path;
///
/// save_config(Path::new("router.json"), &RouterConfig::default()).unwrap();
/// ```
pub fn save_config(path: &Path, config: &RouterConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::SerializationFailed {
            reason: format!("Failed to serialize config: {}", e),
        })?;

    std::fs::write(path, json)?;
    Ok(())
}

/// Load and validate configuration from a JSON file
pub fn load_config(path: &Path) -> Result<RouterConfig> {
    let json = std::fs::read_to_string(path)?;

    let config: RouterConfig =
        serde_json::from_str(&json).map_err(|e| ConfigError::SerializationFailed {
            reason: format!("Failed to deserialize config: {}", e),
        })?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert_eq!(config.link_queue_capacity, 256);
        assert_eq!(config.log_filter, "busroute=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RouterConfig::default()
            .with_link_queue_capacity(32)
            .with_log_filter("busroute=trace");

        assert_eq!(config.link_queue_capacity, 32);
        assert_eq!(config.log_filter, "busroute=trace");
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("router.json");

        let original = RouterConfig::default().with_link_queue_capacity(64);
        save_config(&config_path, &original).unwrap();

        let loaded = load_config(&config_path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("router.json");
        std::fs::write(&config_path, r#"{ "link_queue_capacity": 8 }"#).unwrap();

        let loaded = load_config(&config_path).unwrap();
        assert_eq!(loaded.link_queue_capacity, 8);
        assert_eq!(loaded.log_filter, "busroute=info");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_config(&temp_dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BusError::Io(_)));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("router.json");
        std::fs::write(&config_path, r#"{ "link_queue_capacity": 0 }"#).unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(matches!(
            err,
            BusError::Config(ConfigError::InvalidValue {
                field: "link_queue_capacity",
                ..
            })
        ));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("router.json");
        std::fs::write(&config_path, "not json").unwrap();

        assert!(matches!(
            load_config(&config_path).unwrap_err(),
            BusError::Config(ConfigError::SerializationFailed { .. })
        ));
    }

    #[test]
    fn test_empty_log_filter_invalid() {
        let config = RouterConfig::default().with_log_filter("  ");
        assert!(config.validate().is_err());
    }
}
