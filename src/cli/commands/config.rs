//! `rolekeeper config`: print the effective configuration.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput {
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

pub fn execute(_args: ConfigArgs, config: &Config, json_mode: bool) -> Result<()> {
    output(
        &ConfigOutput {
            config: config.clone(),
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_is_yaml() {
        let out = ConfigOutput {
            config: Config::default(),
        };
        let parsed: Config = serde_yaml::from_str(&out.to_human()).unwrap();
        assert_eq!(parsed.engine.default_period_ms, 5_000);
    }

    #[test]
    fn test_json_output_has_sections() {
        let out = ConfigOutput {
            config: Config::default(),
        };
        let json = out.to_json();
        assert_eq!(json["engine"]["default_timeout_ms"], 30_000);
        assert_eq!(json["logging"]["format"], "pretty");
    }
}
