use clap::Parser;
use deploy_scripts::{cli::Cli, config::ScriptConfig, errors::ScriptError};
use tracing::Level;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ScriptError> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().pretty().with_max_level(level).init();

    let config = ScriptConfig::load(&cli)?;
    cli.command.run(&config).await
}
