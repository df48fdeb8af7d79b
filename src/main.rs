//! Rolekeeper CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use rolekeeper::cli::{Cli, Commands};
use rolekeeper::infrastructure::config::ConfigLoader;
use rolekeeper::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        rolekeeper::cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load_from(cli.config.as_deref())?;
    let log_config = LogConfig::try_from(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Simulate(args) => {
            rolekeeper::cli::commands::simulate::execute(args, &config, cli.json).await
        }
        Commands::Config(args) => rolekeeper::cli::commands::config::execute(args, &config, cli.json),
    }
}
