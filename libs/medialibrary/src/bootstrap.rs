//! Wiring a [`MediaLibrary`] from [`Settings`]

use common::database::{health_check, init_pool};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, warn};

use crate::{
    conversion::ImageTransformer,
    error::{MediaError, MediaResult},
    library::MediaLibrary,
    repository::{InMemoryMediaRepository, MediaRepository, PgMediaRepository, RepositoryError},
    settings::{DiskSettings, RepositoryDriver, Settings},
    storage::{DiskManager, LocalStorage, MemoryStorage, S3Storage},
};

/// Register every configured disk
pub async fn build_disks(disks: &BTreeMap<String, DiskSettings>) -> MediaResult<DiskManager> {
    let manager = DiskManager::new();

    for (name, disk) in disks {
        match disk {
            DiskSettings::Local { root, base_url } => {
                manager.add(name.clone(), Arc::new(LocalStorage::new(root, base_url.clone())?));
            }
            DiskSettings::S3(config) => {
                manager.add(name.clone(), Arc::new(S3Storage::from_config(config).await?));
            }
            DiskSettings::Memory { base_url } => {
                let mut storage = MemoryStorage::new();
                if let Some(base_url) = base_url {
                    storage = storage.with_base_url(base_url.clone());
                }
                manager.add(name.clone(), Arc::new(storage));
            }
        }
        info!("Registered disk: {}", name);
    }

    Ok(manager)
}

/// Connect the configured repository
///
/// The Postgres schema is created when missing.
pub async fn build_repository(settings: &Settings) -> MediaResult<Arc<dyn MediaRepository>> {
    match settings.repository {
        RepositoryDriver::Postgres => {
            let pool = init_pool(&settings.database)
                .await
                .map_err(RepositoryError::from)?;

            if !health_check(&pool).await.map_err(RepositoryError::from)? {
                warn!("Database did not answer the health check");
            }

            let repository = PgMediaRepository::new(pool);
            repository.ensure_schema().await?;
            Ok(Arc::new(repository))
        }
        RepositoryDriver::Memory => {
            warn!("Using the in-memory repository; records are lost on exit");
            Ok(Arc::new(InMemoryMediaRepository::new()))
        }
    }
}

/// Build disks, repository and the default transformer
pub async fn build_library(settings: &Settings) -> MediaResult<MediaLibrary> {
    let disks = build_disks(&settings.disks).await?;

    let library_options = &settings.library;
    if !disks.has(&library_options.default_disk) {
        return Err(MediaError::InvalidConfig(format!(
            "default disk {} is not configured",
            library_options.default_disk
        )));
    }
    if let Some(conversions_disk) = &library_options.conversions_disk {
        if !disks.has(conversions_disk) {
            return Err(MediaError::InvalidConfig(format!(
                "conversions disk {} is not configured",
                conversions_disk
            )));
        }
    }

    let repository = build_repository(settings).await?;

    info!(
        "Media library ready with disks: {}",
        disks.names().join(", ")
    );

    Ok(MediaLibrary::new(
        Arc::new(disks),
        Arc::new(ImageTransformer::with_defaults()),
        repository,
        library_options.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LibraryOptions;

    fn memory_settings() -> Settings {
        let mut disks = BTreeMap::new();
        disks.insert("scratch".to_string(), DiskSettings::Memory { base_url: None });

        Settings {
            repository: RepositoryDriver::Memory,
            library: LibraryOptions::default().with_default_disk("scratch"),
            disks,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_build_library_in_memory() {
        let library = build_library(&memory_settings()).await.unwrap();

        assert!(library.disks().has("scratch"));
        assert!(library.transformer().has_conversion("thumbnail"));
        assert!(library.transformer().responsive_recipe("responsive").is_some());
    }

    #[tokio::test]
    async fn test_unknown_default_disk_is_rejected() {
        let mut settings = memory_settings();
        settings.library.default_disk = "missing".to_string();

        let result = build_library(&settings).await;
        assert!(matches!(result, Err(MediaError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_unknown_conversions_disk_is_rejected() {
        let mut settings = memory_settings();
        settings.library.conversions_disk = Some("missing".to_string());

        let result = build_library(&settings).await;
        assert!(matches!(result, Err(MediaError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_local_disk_requires_root() {
        let mut disks = BTreeMap::new();
        disks.insert(
            "local".to_string(),
            DiskSettings::Local {
                root: std::path::PathBuf::new(),
                base_url: None,
            },
        );

        let result = build_disks(&disks).await;
        assert!(matches!(result, Err(MediaError::Storage(_))));
    }
}
