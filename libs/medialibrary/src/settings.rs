//! Layered runtime settings
//!
//! Sources, lowest priority first: built-in defaults, the `DATABASE_*`
//! variables read by [`DatabaseConfig::from_env`], an optional file, then
//! `MEDIALIBRARY_*` environment variables with `__` separating nested keys:
//!
//! ```text
//! MEDIALIBRARY_LOG_LEVEL=debug
//! MEDIALIBRARY_REPOSITORY=memory
//! MEDIALIBRARY_LIBRARY__DEFAULT_DISK=local
//! MEDIALIBRARY_LIBRARY__PERFORM_CONVERSIONS=thumbnail,preview
//! MEDIALIBRARY_DISKS__LOCAL__DRIVER=local
//! MEDIALIBRARY_DISKS__LOCAL__ROOT=/var/media
//! ```

use common::database::DatabaseConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path, path::PathBuf};

use crate::{options::LibraryOptions, storage::S3Config};

const ENV_PREFIX: &str = "MEDIALIBRARY";
const DEFAULT_SETTINGS_FILE: &str = "medialibrary";

/// Which repository backs the library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryDriver {
    #[default]
    Postgres,
    Memory,
}

/// One named disk
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DiskSettings {
    Local {
        root: PathBuf,
        #[serde(default)]
        base_url: Option<String>,
    },
    S3(S3Config),
    Memory {
        #[serde(default)]
        base_url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub bind_address: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub database: DatabaseConfig,
    pub repository: RepositoryDriver,
    pub library: LibraryOptions,
    pub disks: BTreeMap<String, DiskSettings>,
    pub http: HttpSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let mut disks = BTreeMap::new();
        disks.insert(
            "s3".to_string(),
            DiskSettings::S3(S3Config {
                bucket: "media-bucket".to_string(),
                ..S3Config::default()
            }),
        );

        Self {
            log_level: "info".to_string(),
            database: DatabaseConfig::default(),
            repository: RepositoryDriver::default(),
            library: LibraryOptions::default(),
            disks,
            http: HttpSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `file` (or `medialibrary.{toml,yaml,json}` when
    /// `None`) and the environment
    ///
    /// An explicit file must exist; the default one is optional.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_env();

        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("database.database_url", database.database_url)?
            .set_default(
                "database.max_connections",
                i64::from(database.max_connections),
            )?
            .set_default(
                "database.min_connections",
                i64::from(database.min_connections),
            )?
            .set_default(
                "database.connection_timeout",
                i64::try_from(database.connection_timeout).unwrap_or(i64::MAX),
            )?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("library.perform_conversions")
                    .with_list_parse_key("library.generate_responsive_images")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
