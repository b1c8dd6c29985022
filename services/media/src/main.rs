use anyhow::Result;
use clap::Parser;
use medialibrary::{Settings, bootstrap::build_library};
use tracing::{error, info};

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    common::telemetry::init(&settings.log_level)?;

    info!("Starting media command");

    let library = build_library(&settings).await?;

    match commands::execute(&library, cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("Media command failed: {:#}", e);
            Err(e)
        }
    }
}
