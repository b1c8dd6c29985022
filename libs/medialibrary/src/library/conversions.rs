//! Derived file generation
//!
//! The original is fetched and decoded once per call. Each conversion or
//! responsive width is transformed on the blocking pool and streamed to the
//! conversions disk through an in-memory pipe, so the encoded bytes are never
//! buffered as a whole by the library.

use image::{DynamicImage, ImageResult};
use std::{
    io::{BufWriter, Write},
    sync::Arc,
};
use tokio::io::AsyncReadExt;
use tokio_util::io::SyncIoBridge;
use tracing::{debug, info, instrument, warn};

use super::MediaLibrary;
use crate::{
    conversion::{DerivedCodec, ResponsiveRecipe, TransformError, TransformOptions},
    error::{MediaError, MediaResult},
    models::MediaRecord,
    storage::{SaveOptions, Storage},
};

/// Buffer between the encoder and the storage writer
const PIPE_CAPACITY: usize = 64 * 1024;

impl MediaLibrary {
    /// Generate the named conversions that are not generated yet
    ///
    /// Individual conversions that fail are logged and skipped. The record is
    /// saved once every requested conversion has been attempted.
    #[instrument(skip_all, fields(media_id = ?media.id))]
    pub async fn perform_conversions<S>(
        &self,
        media: &mut MediaRecord,
        conversions: &[S],
    ) -> MediaResult<()>
    where
        S: AsRef<str> + Sync,
    {
        media.require_id()?;

        let mut pending: Vec<String> = Vec::new();
        for name in conversions {
            let name = name.as_ref();
            if media.has_generated_conversion(name) {
                debug!(conversion = name, "Conversion already generated");
                continue;
            }
            if !pending.iter().any(|queued| queued == name) {
                pending.push(name.to_string());
            }
        }

        if !pending.is_empty() {
            let target = self.disk(&media.conversions_disk)?;
            let original = self.load_original(media).await?;
            let codec = DerivedCodec::for_file_name(&media.file_name);

            for name in pending {
                match self
                    .generate_conversion(media, &original, &target, &name, codec)
                    .await
                {
                    Ok(path) => {
                        media.mark_conversion_generated(&name);
                        info!(conversion = %name, path, "Generated conversion");
                    }
                    Err(e) => {
                        warn!(conversion = %name, error = %e, "Conversion failed, skipping");
                    }
                }
            }
        }

        media.touch();
        self.persist(media).await
    }

    /// Generate every missing width of the named responsive recipes
    ///
    /// Unknown recipes and failing widths are logged and skipped.
    #[instrument(skip_all, fields(media_id = ?media.id))]
    pub async fn generate_responsive_images<S>(
        &self,
        media: &mut MediaRecord,
        recipes: &[S],
    ) -> MediaResult<()>
    where
        S: AsRef<str> + Sync,
    {
        media.require_id()?;

        let mut pending: Vec<(Arc<ResponsiveRecipe>, Vec<u32>)> = Vec::new();
        for name in recipes {
            let name = name.as_ref();
            if pending.iter().any(|(recipe, _)| recipe.name == name) {
                continue;
            }
            let Some(recipe) = self.transformer.responsive_recipe(name) else {
                warn!(recipe = name, "No responsive recipe registered, skipping");
                continue;
            };

            let mut widths: Vec<u32> = recipe
                .widths
                .iter()
                .copied()
                .filter(|width| !media.has_responsive_width(name, *width))
                .collect();
            widths.sort_unstable();
            widths.dedup();

            if widths.is_empty() {
                debug!(recipe = name, "Responsive widths already generated");
                continue;
            }
            pending.push((Arc::new(recipe), widths));
        }

        if !pending.is_empty() {
            let target = self.disk(&media.conversions_disk)?;
            let original = self.load_original(media).await?;
            let codec = DerivedCodec::for_file_name(&media.file_name);

            for (recipe, widths) in pending {
                for width in widths {
                    match self
                        .generate_responsive_width(media, &original, &target, &recipe, width, codec)
                        .await
                    {
                        Ok(path) => {
                            media.mark_responsive_width(&recipe.name, width);
                            info!(recipe = %recipe.name, width, path, "Generated responsive image");
                        }
                        Err(e) => {
                            warn!(
                                recipe = %recipe.name,
                                width,
                                error = %e,
                                "Responsive image failed, skipping"
                            );
                        }
                    }
                }
            }
        }

        media.touch();
        self.persist(media).await
    }

    /// Fetch and decode the original of `media`
    async fn load_original(&self, media: &MediaRecord) -> MediaResult<Arc<DynamicImage>> {
        let storage = self.disk(&media.disk)?;
        let path = self.paths.path(media)?;

        let mut reader = storage.get(&path).await?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        debug!(path, size = bytes.len(), "Loaded original");

        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await?
            .map_err(TransformError::from)?;

        Ok(Arc::new(image))
    }

    async fn generate_conversion(
        &self,
        media: &MediaRecord,
        original: &Arc<DynamicImage>,
        target: &Arc<dyn Storage>,
        name: &str,
        codec: DerivedCodec,
    ) -> MediaResult<String> {
        let path = self.paths.path_for_conversion(media, name)?;

        let transformer = Arc::clone(&self.transformer);
        let source = Arc::clone(original);
        let conversion = name.to_string();
        let derived = tokio::task::spawn_blocking(move || {
            transformer.transform(&source, &conversion, &TransformOptions::default())
        })
        .await??;

        self.store_derived(target, &path, derived, codec, &media.mime_type)
            .await?;
        Ok(path)
    }

    async fn generate_responsive_width(
        &self,
        media: &MediaRecord,
        original: &Arc<DynamicImage>,
        target: &Arc<dyn Storage>,
        recipe: &Arc<ResponsiveRecipe>,
        width: u32,
        codec: DerivedCodec,
    ) -> MediaResult<String> {
        let path = self
            .paths
            .path_for_responsive_image(media, &recipe.name, width)?;

        let transformer = Arc::clone(&self.transformer);
        let source = Arc::clone(original);
        let recipe = Arc::clone(recipe);
        let derived = tokio::task::spawn_blocking(move || {
            transformer.transform_responsive(&source, &recipe, width)
        })
        .await??;

        self.store_derived(target, &path, derived, codec, &media.mime_type)
            .await?;
        Ok(path)
    }

    /// Encode `image` straight into `target`
    ///
    /// A partially written object is removed when encoding fails.
    async fn store_derived(
        &self,
        target: &Arc<dyn Storage>,
        path: &str,
        image: DynamicImage,
        codec: DerivedCodec,
        mime_type: &str,
    ) -> MediaResult<()> {
        let (reader, writer) = tokio::io::duplex(PIPE_CAPACITY);
        let bridge = SyncIoBridge::new(writer);

        let encoder = tokio::task::spawn_blocking(move || -> ImageResult<()> {
            let mut sink = BufWriter::new(bridge);
            codec.encode(&image, &mut sink)?;
            sink.flush()?;
            Ok(())
        });

        let options = SaveOptions::public().with_content_type(mime_type);
        let stored = target.save(path, Box::pin(reader), &options).await;

        let encoded = match encoder.await {
            Ok(result) => result.map_err(|e| MediaError::Transform(e.into())),
            Err(e) => Err(MediaError::Task(e)),
        };

        match (stored, encoded) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => {
                if let Err(cleanup) = target.delete(path).await {
                    warn!(path, error = %cleanup, "Failed to remove partial derived file");
                }
                Err(e)
            }
            (Err(e), _) => Err(e.into()),
        }
    }
}
