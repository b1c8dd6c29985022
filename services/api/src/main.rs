use anyhow::Result;
use clap::Parser;
use medialibrary::{Settings, bootstrap::build_library};
use std::path::PathBuf;
use tracing::info;

mod error;
mod models;
mod routes;
mod state;

use crate::state::AppState;

/// HTTP front end of the media library
#[derive(Debug, Parser)]
#[command(name = "api", version, about)]
struct Args {
    /// Settings file; `medialibrary.toml` in the working directory otherwise
    #[arg(long, env = "MEDIALIBRARY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?;
    common::telemetry::init(&settings.log_level)?;

    info!("Starting API service");

    let library = build_library(&settings).await?;

    info!("API service initialized successfully");

    let app_state = AppState { library };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.http.bind_address).await?;
    info!("API service listening on {}", settings.http.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
