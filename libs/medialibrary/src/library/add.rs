//! Ingestion from URLs, local files and other disks

use percent_encoding::percent_decode_str;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument, warn};

use super::{MediaLibrary, file_name_from};
use crate::{
    error::{MediaError, MediaResult},
    models::{DEFAULT_COLLECTION, MediaOwner, MediaRecord},
    options::{AddMediaOptions, ResolvedOptions},
    storage::{SaveOptions, Storage},
};

/// Where the bytes of a new original come from
enum Source<'a> {
    Url(&'a str),
    File(PathBuf),
    Disk {
        storage: Arc<dyn Storage>,
        path: &'a str,
    },
}

impl MediaLibrary {
    /// Download `url` into `collection`
    #[instrument(skip(self, options))]
    pub async fn add_media_from_url(
        &self,
        url: &str,
        collection: &str,
        options: AddMediaOptions,
    ) -> MediaResult<MediaRecord> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| MediaError::InvalidSource(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MediaError::InvalidSource(format!(
                "unsupported URL scheme {}",
                parsed.scheme()
            )));
        }
        let file_name = url_file_name(&parsed)?;

        let resolved = self.options.resolve(&options);
        self.ingest(Source::Url(url), file_name, collection, resolved)
            .await
    }

    /// Download `url` and attach the record to an owner
    pub async fn add_media_from_url_to_model(
        &self,
        url: &str,
        owner_type: &str,
        owner_id: u64,
        collection: &str,
        mut options: AddMediaOptions,
    ) -> MediaResult<MediaRecord> {
        options.owner = Some(MediaOwner::new(owner_type, owner_id));
        self.add_media_from_url(url, collection, options).await
    }

    /// Store a local file into `collection`
    #[instrument(skip(self, path, options), fields(path = %path.as_ref().display()))]
    pub async fn add_media_from_file(
        &self,
        path: impl AsRef<Path>,
        collection: &str,
        options: AddMediaOptions,
    ) -> MediaResult<MediaRecord> {
        let path = path.as_ref();

        let is_file = tokio::fs::metadata(path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(MediaError::InvalidSource(format!(
                "{} is not a readable file",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                MediaError::InvalidSource(format!("{} has no usable file name", path.display()))
            })
            .and_then(file_name_from)?;

        let resolved = self.options.resolve(&options);
        self.ingest(Source::File(path.to_path_buf()), file_name, collection, resolved)
            .await
    }

    /// Store a local file and attach the record to an owner
    pub async fn add_media_from_file_to_model(
        &self,
        path: impl AsRef<Path>,
        owner_type: &str,
        owner_id: u64,
        collection: &str,
        mut options: AddMediaOptions,
    ) -> MediaResult<MediaRecord> {
        options.owner = Some(MediaOwner::new(owner_type, owner_id));
        self.add_media_from_file(path, collection, options).await
    }

    /// Import an object that already lives on another disk
    ///
    /// `target_disk` takes precedence over any disk in `options`.
    #[instrument(skip(self, options))]
    pub async fn add_media_from_disk_to_disk(
        &self,
        source_disk: &str,
        source_path: &str,
        target_disk: &str,
        collection: &str,
        mut options: AddMediaOptions,
    ) -> MediaResult<MediaRecord> {
        let source = self.disk(source_disk)?;
        if !source.exists(source_path).await? {
            return Err(MediaError::MissingObject {
                disk: source_disk.to_string(),
                path: source_path.to_string(),
            });
        }
        let file_name = file_name_from(source_path)?;

        options.disk = Some(target_disk.to_string());
        let resolved = self.options.resolve(&options);
        self.ingest(
            Source::Disk {
                storage: source,
                path: source_path,
            },
            file_name,
            collection,
            resolved,
        )
        .await
    }

    async fn ingest(
        &self,
        source: Source<'_>,
        file_name: String,
        collection: &str,
        resolved: ResolvedOptions,
    ) -> MediaResult<MediaRecord> {
        let storage = self.disk(&resolved.disk)?;

        let mut media = self.new_record(file_name, collection, &resolved);
        self.persist(&mut media).await?;
        let media_id = media.require_id()?;

        let path = self.paths.path(&media)?;
        debug!(media_id, disk = %media.disk, path, "Transferring original");

        match source {
            Source::Url(url) => {
                // The response content type beats an extension guess here.
                storage
                    .save_from_url(&path, url, &SaveOptions::public())
                    .await?;
            }
            Source::File(local) => {
                let file = tokio::fs::File::open(&local).await?;
                let options = SaveOptions::public().with_content_type(media.mime_type.clone());
                storage.save(&path, Box::pin(file), &options).await?;
            }
            Source::Disk {
                storage: origin,
                path: origin_path,
            } => {
                let reader = origin.get(origin_path).await?;
                let options = SaveOptions::public().with_content_type(media.mime_type.clone());
                storage.save(&path, reader, &options).await?;
            }
        }
        info!(media_id, disk = %media.disk, path, "Stored original");

        let (size, mime_type) = self.inspect_object(&storage, &path, &media.file_name).await?;
        media.size = size;
        media.mime_type = mime_type.to_string();
        media.touch();
        self.persist(&mut media).await?;

        self.generate_after_ingest(&mut media, &resolved).await;

        Ok(media)
    }

    fn new_record(
        &self,
        file_name: String,
        collection: &str,
        resolved: &ResolvedOptions,
    ) -> MediaRecord {
        let mut media = MediaRecord::new(file_name, resolved.disk.clone());

        media.conversions_disk = resolved.conversions_disk.clone();
        media.collection_name = if collection.is_empty() {
            DEFAULT_COLLECTION.to_string()
        } else {
            collection.to_string()
        };
        if let Some(name) = &resolved.name {
            media.name = name.clone();
        }
        media.owner = resolved.owner.clone();
        media.custom_properties = resolved.custom_properties.clone();
        media.order_column = resolved.order_column;

        media
    }

    /// Derived files requested at ingestion; failures never fail the ingestion
    async fn generate_after_ingest(&self, media: &mut MediaRecord, resolved: &ResolvedOptions) {
        if resolved.auto_generate_conversions && !resolved.perform_conversions.is_empty() {
            if let Err(e) = self
                .perform_conversions(media, &resolved.perform_conversions)
                .await
            {
                warn!(media_id = ?media.id, error = %e, "Conversions after ingestion failed");
            }
        }

        if !resolved.generate_responsive_images.is_empty() {
            if let Err(e) = self
                .generate_responsive_images(media, &resolved.generate_responsive_images)
                .await
            {
                warn!(media_id = ?media.id, error = %e, "Responsive images after ingestion failed");
            }
        }
    }
}

/// Decoded last path segment of a download URL
fn url_file_name(url: &reqwest::Url) -> MediaResult<String> {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let decoded = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|e| MediaError::InvalidSource(format!("{}: {}", url, e)))?;

    file_name_from(&decoded)
}
