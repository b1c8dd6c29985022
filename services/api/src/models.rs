//! Request and response bodies

use medialibrary::{AddMediaOptions, MediaLibrary, MediaRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a new original is read from
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSource {
    Url { url: String },
    Disk { disk: String, path: String },
}

#[derive(Debug, Deserialize)]
pub struct AddMediaRequest {
    pub source: MediaSource,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub options: AddMediaOptions,
}

#[derive(Debug, Deserialize)]
pub struct ConversionsRequest {
    pub conversions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsiveImagesRequest {
    pub recipes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub disk: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    /// Seconds a temporary URL stays valid
    pub temporary: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ModelMediaQuery {
    pub collection: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponsiveUrl {
    pub width: u32,
    pub url: String,
}

/// A record with every URL that resolves for it
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaResponse {
    pub media: MediaRecord,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_url: Option<String>,
    pub conversion_urls: BTreeMap<String, String>,
    pub responsive_urls: BTreeMap<String, Vec<ResponsiveUrl>>,
}

impl MediaResponse {
    pub fn new(library: &MediaLibrary, media: MediaRecord) -> Self {
        let conversion_urls = media
            .generated_conversions
            .iter()
            .filter(|(_, generated)| **generated)
            .map(|(name, _)| (name.clone(), library.url_for_conversion(&media, name)))
            .collect();

        let responsive_urls = media
            .responsive_images
            .keys()
            .map(|name| {
                let urls = library
                    .responsive_image_urls(&media, name)
                    .into_iter()
                    .map(|(width, url)| ResponsiveUrl { width, url })
                    .collect();
                (name.clone(), urls)
            })
            .collect();

        Self {
            url: library.url_for_media(&media),
            temporary_url: None,
            conversion_urls,
            responsive_urls,
            media,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MediaListResponse {
    pub items: Vec<MediaResponse>,
    pub total: usize,
}
