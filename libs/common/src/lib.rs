//! Common library for the media workspace
//!
//! This crate provides the infrastructure shared by the media library and
//! the services built on top of it: PostgreSQL connectivity, the database
//! error taxonomy, and tracing initialisation for the binaries.

pub mod database;
pub mod error;
pub mod telemetry;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, health_check};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env();
///     let pool = init_pool(&config).await?;
///     let is_healthy = health_check(&pool).await?;
///     println!("Database health check: {}", is_healthy);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
