//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::config::ConfigArgs;
use crate::cli::commands::simulate::SimulateArgs;

#[derive(Parser, Debug)]
#[command(name = "rolekeeper")]
#[command(about = "Rolekeeper - membership role convergence engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .rolekeeper/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one convergence against a simulated platform
    Simulate(SimulateArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}
