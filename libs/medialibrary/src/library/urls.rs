//! Public and temporary URLs
//!
//! URL lookups never fail: an unknown disk, an unsaved record or a derived
//! file that was never generated yields an empty string.

use std::time::Duration;
use tracing::debug;

use super::MediaLibrary;
use crate::{error::MediaResult, models::MediaRecord};

impl MediaLibrary {
    pub fn url_for_media(&self, media: &MediaRecord) -> String {
        self.public_url(&media.disk, self.paths.path(media))
    }

    /// URL of a generated conversion
    pub fn url_for_conversion(&self, media: &MediaRecord, conversion: &str) -> String {
        if !media.has_generated_conversion(conversion) {
            debug!(media_id = ?media.id, conversion, "Conversion not generated");
            return String::new();
        }

        self.public_url(
            &media.conversions_disk,
            self.paths.path_for_conversion(media, conversion),
        )
    }

    /// URL of one generated responsive width
    pub fn url_for_responsive_image(
        &self,
        media: &MediaRecord,
        conversion: &str,
        width: u32,
    ) -> String {
        if !media.has_responsive_width(conversion, width) {
            debug!(media_id = ?media.id, conversion, width, "Responsive width not generated");
            return String::new();
        }

        self.public_url(
            &media.conversions_disk,
            self.paths
                .path_for_responsive_image(media, conversion, width),
        )
    }

    /// `(width, url)` for every generated width of a recipe, narrowest first
    pub fn responsive_image_urls(&self, media: &MediaRecord, conversion: &str) -> Vec<(u32, String)> {
        media
            .responsive_widths(conversion)
            .into_iter()
            .map(|width| (width, self.url_for_responsive_image(media, conversion, width)))
            .filter(|(_, url)| !url.is_empty())
            .collect()
    }

    /// Time-limited URL of the original
    pub async fn temporary_url_for_media(
        &self,
        media: &MediaRecord,
        expires_in: Duration,
    ) -> MediaResult<String> {
        let storage = self.disk(&media.disk)?;
        let path = self.paths.path(media)?;

        Ok(storage.temporary_url(&path, expires_in).await?)
    }

    fn public_url(&self, disk: &str, path: MediaResult<String>) -> String {
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "No storage key for media");
                return String::new();
            }
        };

        match self.disk(disk) {
            Ok(storage) => storage.url(&path),
            Err(e) => {
                debug!(disk, error = %e, "No disk for media URL");
                String::new()
            }
        }
    }
}
