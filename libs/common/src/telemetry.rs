//! Tracing initialisation shared by the binaries

use crate::error::TelemetryError;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber on stderr filtered by `RUST_LOG`, falling back to `default_level`
///
/// # Arguments
///
/// * `default_level` - filter directive used when `RUST_LOG` is unset, e.g. `info`
pub fn init(default_level: &str) -> Result<(), TelemetryError> {
    let filter = build_filter(default_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))
}

fn build_filter(default_level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_level)?),
    }
}
