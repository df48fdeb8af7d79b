use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project config file, relative to the working directory
pub const PROJECT_CONFIG_PATH: &str = ".rolekeeper/config.yaml";

/// Project local overrides, relative to the working directory
pub const LOCAL_CONFIG_PATH: &str = ".rolekeeper/local.yaml";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "ROLEKEEPER_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid default_max_tries: {0}. Must be at least 1")]
    InvalidMaxTries(u32),

    #[error("Invalid default_period_ms: {0}. Must be positive")]
    InvalidPeriod(u64),

    #[error("Invalid default_timeout_ms: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error("Invalid report_channel_capacity: {0}. Must be at least 1")]
    InvalidReportCapacity(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Guild id cannot be empty")]
    EmptyGuildId,

    #[error("Guild '{0}' member_role_id cannot be empty")]
    EmptyMemberRole(String),

    #[error("Guild '{0}' is configured more than once")]
    DuplicateGuild(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .rolekeeper/config.yaml (project config)
    /// 3. .rolekeeper/local.yaml (project local overrides, optional)
    /// 4. Environment variables (ROLEKEEPER_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(PROJECT_CONFIG_PATH))
            .merge(Yaml::file(LOCAL_CONFIG_PATH))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still take precedence over the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from `path` when given, from the project files otherwise
    pub fn load_from(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let engine = &config.engine;
        if engine.default_max_tries == 0 {
            return Err(ConfigError::InvalidMaxTries(engine.default_max_tries));
        }
        if engine.default_period_ms == 0 {
            return Err(ConfigError::InvalidPeriod(engine.default_period_ms));
        }
        if engine.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(engine.default_timeout_ms));
        }
        if engine.report_channel_capacity == 0 {
            return Err(ConfigError::InvalidReportCapacity(
                engine.report_channel_capacity,
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

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(
                config.logging.rotation.clone(),
            ));
        }

        let mut seen = HashSet::new();
        for guild in &config.guilds {
            if guild.id.is_empty() {
                return Err(ConfigError::EmptyGuildId);
            }
            if guild.member_role_id.is_empty() {
                return Err(ConfigError::EmptyMemberRole(guild.id.clone()));
            }
            if !seen.insert(guild.id.as_str()) {
                return Err(ConfigError::DuplicateGuild(guild.id.clone()));
            }
        }

        Ok(())
    }
}
