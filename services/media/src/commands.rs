//! Executes CLI commands against a media library

use anyhow::{Context, Result};
use medialibrary::{MediaLibrary, MediaRecord};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::info;

use crate::cli::Command;

/// Run `command`, returning the JSON document to print
pub async fn execute(library: &MediaLibrary, command: Command) -> Result<Value> {
    match command {
        Command::AddUrl { url, add } => {
            let media = library
                .add_media_from_url(&url, &add.collection, add.to_options())
                .await
                .with_context(|| format!("Failed to add {}", url))?;
            Ok(describe(library, &media))
        }
        Command::AddFile { path, add } => {
            let media = library
                .add_media_from_file(&path, &add.collection, add.to_options())
                .await
                .with_context(|| format!("Failed to add {}", path.display()))?;
            Ok(describe(library, &media))
        }
        Command::Import {
            source_disk,
            source_path,
            target_disk,
            add,
        } => {
            let media = library
                .add_media_from_disk_to_disk(
                    &source_disk,
                    &source_path,
                    &target_disk,
                    &add.collection,
                    add.to_options(),
                )
                .await
                .with_context(|| format!("Failed to import {}:{}", source_disk, source_path))?;
            Ok(describe(library, &media))
        }
        Command::Convert { id, conversions } => {
            let mut media = find(library, id).await?;
            library.perform_conversions(&mut media, &conversions).await?;
            Ok(describe(library, &media))
        }
        Command::Responsive { id, recipes } => {
            let mut media = find(library, id).await?;
            library
                .generate_responsive_images(&mut media, &recipes)
                .await?;
            Ok(describe(library, &media))
        }
        Command::Copy { id, disk } => {
            let media = find(library, id).await?;
            let copy = library.copy_media_to_disk(&media, &disk).await?;
            Ok(describe(library, &copy))
        }
        Command::Move { id, disk } => {
            let media = find(library, id).await?;
            let moved = library.move_media_to_disk(&media, &disk).await?;
            Ok(describe(library, &moved))
        }
        Command::Show { id, temporary } => {
            let media = find(library, id).await?;
            let mut view = describe(library, &media);
            if let Some(seconds) = temporary {
                let url = library
                    .temporary_url_for_media(&media, Duration::from_secs(seconds))
                    .await?;
                view["temporary_url"] = Value::String(url);
            }
            Ok(view)
        }
        Command::List {
            owner_type,
            owner_id,
            collection,
        } => {
            let records = match (owner_type, owner_id, collection) {
                (Some(owner_type), Some(owner_id), Some(collection)) => {
                    library
                        .media_for_model_and_collection(&owner_type, owner_id, &collection)
                        .await?
                }
                (Some(owner_type), Some(owner_id), None) => {
                    library.media_for_model(&owner_type, owner_id).await?
                }
                (_, _, Some(collection)) => library.media_in_collection(&collection).await?,
                _ => anyhow::bail!("Either an owner or a collection is required"),
            };
            Ok(Value::Array(
                records
                    .iter()
                    .map(|media| describe(library, media))
                    .collect(),
            ))
        }
        Command::Delete { id } => {
            let media = find(library, id).await?;
            library.delete_media(&media).await?;
            info!("Deleted media {}", id);
            Ok(json!({ "deleted": id }))
        }
    }
}

async fn find(library: &MediaLibrary, id: u64) -> Result<MediaRecord> {
    library
        .find_media(id)
        .await?
        .with_context(|| format!("Media {} not found", id))
}

/// The record plus every URL that resolves for it
fn describe(library: &MediaLibrary, media: &MediaRecord) -> Value {
    let conversions: Map<String, Value> = media
        .generated_conversions
        .iter()
        .filter(|(_, generated)| **generated)
        .map(|(name, _)| {
            (
                name.clone(),
                Value::String(library.url_for_conversion(media, name)),
            )
        })
        .collect();

    let responsive: Map<String, Value> = media
        .responsive_images
        .keys()
        .map(|name| {
            let urls: Vec<Value> = library
                .responsive_image_urls(media, name)
                .into_iter()
                .map(|(width, url)| json!({ "width": width, "url": url }))
                .collect();
            (name.clone(), Value::Array(urls))
        })
        .collect();

    json!({
        "media": media,
        "url": library.url_for_media(media),
        "conversion_urls": conversions,
        "responsive_urls": responsive,
    })
}
