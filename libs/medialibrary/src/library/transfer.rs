//! Copy, move and delete

use std::io::Cursor;
use tokio::io::AsyncReadExt;
use tracing::{info, instrument, warn};

use super::MediaLibrary;
use crate::{
    error::{MediaError, MediaResult},
    mime,
    models::MediaRecord,
    storage::SaveOptions,
};

impl MediaLibrary {
    /// Duplicate the original onto `target_disk` under a new record
    ///
    /// Derived files are not copied. The copy still carries the source's
    /// derived-file index, so its conversion URLs may point at nothing until
    /// the conversions are generated for it.
    #[instrument(skip(self, media), fields(media_id = ?media.id))]
    pub async fn copy_media_to_disk(
        &self,
        media: &MediaRecord,
        target_disk: &str,
    ) -> MediaResult<MediaRecord> {
        self.transfer(media, target_disk, false).await
    }

    /// Copy to `target_disk`, then delete the source record and its files
    ///
    /// Unlike a copy, the MIME type is detected again from the bytes.
    #[instrument(skip(self, media), fields(media_id = ?media.id))]
    pub async fn move_media_to_disk(
        &self,
        media: &MediaRecord,
        target_disk: &str,
    ) -> MediaResult<MediaRecord> {
        let moved = self.transfer(media, target_disk, true).await?;
        self.delete_media(media).await?;

        info!(from = ?media.id, to = ?moved.id, "Moved media");
        Ok(moved)
    }

    /// Delete the original, every derived file and the record
    ///
    /// Derived files that cannot be removed are logged and left behind.
    #[instrument(skip(self, media), fields(media_id = ?media.id))]
    pub async fn delete_media(&self, media: &MediaRecord) -> MediaResult<()> {
        let storage = self.disk(&media.disk)?;
        let path = self.paths.path(media)?;

        storage.delete(&path).await?;
        self.delete_derived_files(media).await;
        self.repository.delete(media).await?;

        info!(path, disk = %media.disk, "Deleted media");
        Ok(())
    }

    async fn transfer(
        &self,
        media: &MediaRecord,
        target_disk: &str,
        detect_mime: bool,
    ) -> MediaResult<MediaRecord> {
        let source = self.disk(&media.disk)?;
        let target = self.disk(target_disk)?;

        let source_path = self.paths.path(media)?;
        if !source.exists(&source_path).await? {
            return Err(MediaError::MissingObject {
                disk: media.disk.clone(),
                path: source_path,
            });
        }

        let mut reader = source.get(&source_path).await?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let mut copy = media.duplicate_to(target_disk);
        copy.size = bytes.len() as u64;
        if detect_mime {
            let head = &bytes[..bytes.len().min(mime::SNIFF_LEN)];
            copy.mime_type = mime::detect(head, &copy.file_name).to_string();
        }
        self.persist(&mut copy).await?;

        let target_path = self.paths.path(&copy)?;
        let options = SaveOptions::public().with_content_type(copy.mime_type.clone());
        target
            .save(&target_path, Box::pin(Cursor::new(bytes)), &options)
            .await?;

        info!(
            source = %source_path,
            target = %target_path,
            disk = target_disk,
            "Copied original"
        );
        Ok(copy)
    }

    async fn delete_derived_files(&self, media: &MediaRecord) {
        let storage = match self.disk(&media.conversions_disk) {
            Ok(storage) => storage,
            Err(e) => {
                warn!(disk = %media.conversions_disk, error = %e, "Skipping derived file cleanup");
                return;
            }
        };

        let mut paths = Vec::new();
        for (name, generated) in &media.generated_conversions {
            if *generated {
                paths.push(self.paths.path_for_conversion(media, name));
            }
        }
        for (name, entry) in &media.responsive_images {
            for width in &entry.widths {
                paths.push(self.paths.path_for_responsive_image(media, name, *width));
            }
        }

        for path in paths {
            let result = match path {
                Ok(path) => storage.delete(&path).await.map_err(MediaError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to delete derived file");
            }
        }
    }
}
