//! Definitions of CLI arguments and commands for the status scripts

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
    commands::{compare, pull, status},
    config::ScriptConfig,
    errors::ScriptError,
};

/// Compare the deployment records of a project against the chain
#[derive(Parser)]
pub struct Cli {
    /// The project root directory
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// The network to operate on
    #[arg(short, long)]
    pub network: String,

    /// Network RPC URL, overriding the project config
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Timeout in seconds for each chain query
    #[arg(short, long, env = "QUERY_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Report every difference between the local records and the chain,
    /// without modifying anything
    Compare,
    /// Update the local records to match the chain
    Pull,
    /// Summarize the local deployment state of the project
    Status,
}

impl Command {
    /// Run the command
    pub async fn run(self, config: &ScriptConfig) -> Result<(), ScriptError> {
        match self {
            Command::Compare => compare(config).await,
            Command::Pull => pull(config).await,
            Command::Status => status(config),
        }
    }
}
