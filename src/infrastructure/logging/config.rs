use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::models::LoggingConfig;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stdout)
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl LogFormat {
    pub fn parse(format: &str) -> Result<Self> {
        match format.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => bail!("Invalid log format: {format}"),
        }
    }
}

impl RotationPolicy {
    pub fn parse(rotation: &str) -> Result<Self> {
        match rotation.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            _ => bail!("Invalid log rotation: {rotation}"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

impl TryFrom<&LoggingConfig> for LogConfig {
    type Error = anyhow::Error;

    fn try_from(config: &LoggingConfig) -> Result<Self> {
        Ok(Self {
            level: config.level.clone(),
            format: LogFormat::parse(&config.format)?,
            log_dir: config.log_dir.as_ref().map(PathBuf::from),
            enable_stdout: config.enable_stdout,
            rotation: RotationPolicy::parse(&config.rotation)?,
        })
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_logging_config() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            log_dir: Some("/tmp/rolekeeper".to_string()),
            rotation: "hourly".to_string(),
            enable_stdout: false,
        };

        let config = LogConfig::try_from(&logging).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/rolekeeper")));
        assert_eq!(config.rotation, RotationPolicy::Hourly);
        assert!(!config.enable_stdout);
    }

    #[test]
    fn test_default_logging_config_converts() {
        let config = LogConfig::try_from(&LoggingConfig::default()).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.rotation, RotationPolicy::Daily);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(LogFormat::parse("xml").is_err());
        assert!(RotationPolicy::parse("weekly").is_err());
        assert_eq!(LogFormat::parse("JSON").unwrap(), LogFormat::Json);
    }
}
