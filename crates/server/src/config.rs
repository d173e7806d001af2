use std::fs;
use std::path::Path;

use micro_bridge::BridgeConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::Level;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("invalid config file {path}: {source}")]
    Parse { path: String, source: serde_json::Error },

    #[error("invalid log level {level:?}")]
    LogLevel { level: String },
}

/// Settings of the demo server, loaded from a JSON file.
///
/// ```json
/// {
///   "address": "127.0.0.1:8080",
///   "log_level": "debug",
///   "bridge": { "h2c_upgrade": true, "pretty": true }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: String,
    pub log_level: String,
    pub bridge: BridgeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: "127.0.0.1:8080".to_owned(), log_level: "info".to_owned(), bridge: BridgeConfig::default() }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::from_json(&content).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn max_level(&self) -> Result<Level, ConfigError> {
        self.log_level.parse().map_err(|_e| ConfigError::LogLevel { level: self.log_level.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = ServerConfig::from_json("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.max_level().unwrap(), Level::INFO);
    }

    #[test]
    fn nested_bridge_settings() {
        let config = ServerConfig::from_json(r#"{"log_level":"debug","bridge":{"h2c_upgrade":true}}"#).unwrap();
        assert!(config.bridge.h2c_upgrade);
        assert!(!config.bridge.pretty);
        assert_eq!(config.max_level().unwrap(), Level::DEBUG);
    }

    #[test]
    fn bad_log_level() {
        let config = ServerConfig::from_json(r#"{"log_level":"chatty"}"#).unwrap();
        assert!(matches!(config.max_level(), Err(ConfigError::LogLevel { .. })));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ServerConfig::from_json(r#"{"port":8080}"#).is_err());
    }
}
