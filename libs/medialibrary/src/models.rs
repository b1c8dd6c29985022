//! Media record model and its derived-artifact index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Collection used when the caller does not name one
pub const DEFAULT_COLLECTION: &str = "default";

/// Polymorphic owner of a media record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaOwner {
    /// Caller-defined model type, e.g. `posts`
    pub owner_type: String,
    /// ID of the owning model
    pub owner_id: u64,
}

impl MediaOwner {
    pub fn new(owner_type: impl Into<String>, owner_id: u64) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id,
        }
    }
}

/// Widths generated for one responsive recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsiveWidths {
    pub widths: BTreeSet<u32>,
}

/// Responsive widths keyed by recipe name
pub type ResponsiveImages = BTreeMap<String, ResponsiveWidths>;

/// A stored media file and everything known about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Repository ID, unset until the first save
    pub id: Option<u64>,
    /// Client-side identity assigned at construction
    pub uuid: Uuid,
    pub owner: Option<MediaOwner>,
    pub collection_name: String,
    /// Display name
    pub name: String,
    pub file_name: String,
    pub mime_type: String,
    /// Disk holding the original file
    pub disk: String,
    /// Disk holding conversions and responsive images
    pub conversions_disk: String,
    /// Size of the original in bytes
    pub size: u64,
    /// Reserved for per-record transform overrides, always an object
    pub manipulations: Value,
    pub custom_properties: Map<String, Value>,
    /// Conversions produced so far
    pub generated_conversions: BTreeMap<String, bool>,
    /// Responsive widths produced so far
    pub responsive_images: ResponsiveImages,
    pub order_column: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Create an unsaved record for `file_name` stored on `disk`
    ///
    /// The display name defaults to the file stem, the conversions disk to
    /// `disk`, and the collection to [`DEFAULT_COLLECTION`].
    pub fn new(file_name: impl Into<String>, disk: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let disk = disk.into();
        let now = Utc::now();

        Self {
            id: None,
            uuid: Uuid::new_v4(),
            owner: None,
            collection_name: DEFAULT_COLLECTION.to_string(),
            name: crate::path::file_stem(&file_name).to_string(),
            mime_type: crate::mime::from_extension(&file_name).to_string(),
            file_name,
            conversions_disk: disk.clone(),
            disk,
            size: 0,
            manipulations: Value::Object(Map::new()),
            custom_properties: Map::new(),
            generated_conversions: BTreeMap::new(),
            responsive_images: BTreeMap::new(),
            order_column: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Repository ID, or [`MediaError::Unpersisted`] when the record was never saved
    pub fn require_id(&self) -> MediaResult<u64> {
        match self.id {
            Some(id) if id != 0 => Ok(id),
            _ => Err(MediaError::Unpersisted),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.require_id().is_ok()
    }

    /// Whether the record belongs to the given owner
    pub fn belongs_to(&self, owner_type: &str, owner_id: u64) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|o| o.owner_type == owner_type && o.owner_id == owner_id)
    }

    pub fn has_generated_conversion(&self, name: &str) -> bool {
        self.generated_conversions.get(name).copied().unwrap_or(false)
    }

    pub fn mark_conversion_generated(&mut self, name: &str) {
        self.generated_conversions.insert(name.to_string(), true);
        self.touch();
    }

    pub fn has_responsive_width(&self, name: &str, width: u32) -> bool {
        self.responsive_images
            .get(name)
            .is_some_and(|entry| entry.widths.contains(&width))
    }

    pub fn mark_responsive_width(&mut self, name: &str, width: u32) {
        self.responsive_images
            .entry(name.to_string())
            .or_default()
            .widths
            .insert(width);
        self.touch();
    }

    /// Generated widths for `name`, ascending
    pub fn responsive_widths(&self, name: &str) -> Vec<u32> {
        self.responsive_images
            .get(name)
            .map(|entry| entry.widths.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Unsaved duplicate placed on `disk` with a fresh UUID
    ///
    /// Everything descriptive is carried over, including the derived-artifact
    /// index, even though no derived files travel with it.
    pub fn duplicate_to(&self, disk: &str) -> Self {
        let now = Utc::now();

        Self {
            id: None,
            uuid: Uuid::new_v4(),
            disk: disk.to_string(),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let media = MediaRecord::new("holiday.photo.JPG", "s3");

        assert_eq!(media.id, None);
        assert_eq!(media.name, "holiday.photo");
        assert_eq!(media.mime_type, "image/jpeg");
        assert_eq!(media.conversions_disk, "s3");
        assert_eq!(media.collection_name, DEFAULT_COLLECTION);
        assert_eq!(media.manipulations, Value::Object(Map::new()));
        assert!(media.generated_conversions.is_empty());
        assert!(matches!(media.require_id(), Err(MediaError::Unpersisted)));
    }

    #[test]
    fn test_zero_id_counts_as_unpersisted() {
        let mut media = MediaRecord::new("a.png", "local");
        media.id = Some(0);
        assert!(!media.is_persisted());

        media.id = Some(7);
        assert_eq!(media.require_id().unwrap(), 7);
    }

    #[test]
    fn test_index_marks_are_monotonic() {
        let mut media = MediaRecord::new("a.png", "local");
        let before = media.updated_at;

        media.mark_conversion_generated("thumb");
        media.mark_responsive_width("responsive", 640);
        media.mark_responsive_width("responsive", 320);
        media.mark_responsive_width("responsive", 640);

        assert!(media.has_generated_conversion("thumb"));
        assert!(!media.has_generated_conversion("preview"));
        assert!(media.has_responsive_width("responsive", 320));
        assert!(!media.has_responsive_width("responsive", 960));
        assert_eq!(media.responsive_widths("responsive"), vec![320, 640]);
        assert!(media.updated_at >= before);
    }

    #[test]
    fn test_responsive_index_serialises_as_width_lists() {
        let mut media = MediaRecord::new("a.png", "local");
        media.mark_responsive_width("responsive", 960);
        media.mark_responsive_width("responsive", 320);

        let json = serde_json::to_value(&media.responsive_images).unwrap();
        assert_eq!(json, serde_json::json!({"responsive": {"widths": [320, 960]}}));
    }

    #[test]
    fn test_duplicate_keeps_descriptive_fields() {
        let mut media = MediaRecord::new("a.png", "local");
        media.id = Some(3);
        media.owner = Some(MediaOwner::new("posts", 1));
        media.mark_conversion_generated("thumb");

        let copy = media.duplicate_to("backup");

        assert_eq!(copy.id, None);
        assert_ne!(copy.uuid, media.uuid);
        assert_eq!(copy.disk, "backup");
        assert_eq!(copy.conversions_disk, "local");
        assert_eq!(copy.owner, media.owner);
        assert!(copy.has_generated_conversion("thumb"));
        assert!(copy.belongs_to("posts", 1));
        assert!(!copy.belongs_to("posts", 2));
    }
}
