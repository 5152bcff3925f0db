use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid rate limit window: {0}. Must be positive")]
    InvalidWindow(u64),

    #[error("Invalid rate limit ceiling: {0}. Must be at least 1")]
    InvalidCeiling(u32),

    #[error("Invalid conversation TTL: {0}. Must be positive")]
    InvalidConversationTtl(i64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be <= max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .questline/config.yaml (project config, created by init)
    /// 3. .questline/local.yaml (local overrides, optional)
    /// 4. Environment variables (QUESTLINE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".questline/config.yaml"))
            .merge(Yaml::file(".questline/local.yaml"))
            .merge(Env::prefixed("QUESTLINE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidWindow(config.rate_limit.window_secs));
        }
        if config.rate_limit.max_per_window == 0 {
            return Err(ConfigError::InvalidCeiling(config.rate_limit.max_per_window));
        }
        for &ceiling in config.rate_limit.action_limits.values() {
            if ceiling == 0 {
                return Err(ConfigError::InvalidCeiling(ceiling));
            }
        }

        if config.builder.conversation_ttl_secs <= 0 {
            return Err(ConfigError::InvalidConversationTtl(
                config.builder.conversation_ttl_secs,
            ));
        }

        if config.llm.initial_backoff_ms > config.llm.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.llm.initial_backoff_ms,
                config.llm.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ConfigLoader::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_database_path_rejected() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.rate_limit.window_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_zero_action_override_rejected() {
        let mut config = Config::default();
        config.rate_limit.action_limits.insert("author".into(), 0);
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_inverted_backoff_rejected() {
        let mut config = Config::default();
        config.llm.initial_backoff_ms = 10_000;
        config.llm.max_backoff_ms = 1_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(10_000, 1_000))
        ));
    }
}
