//! Library-wide defaults and per-call overrides
//!
//! Scalars and lists in [`AddMediaOptions`] replace the library default when
//! set. Custom properties merge key by key with the per-call value winning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::MediaOwner;

/// Defaults applied to every ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryOptions {
    /// Disk receiving originals
    pub default_disk: String,
    /// Disk receiving derived artifacts, the record's own disk when unset
    pub conversions_disk: Option<String>,
    /// Run `perform_conversions` right after ingestion
    pub auto_generate_conversions: bool,
    pub perform_conversions: Vec<String>,
    /// Responsive recipes generated right after ingestion
    pub generate_responsive_images: Vec<String>,
    pub custom_properties: Map<String, Value>,
    /// Leading segment of every storage key
    pub path_prefix: String,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            default_disk: "s3".to_string(),
            conversions_disk: None,
            auto_generate_conversions: false,
            perform_conversions: Vec::new(),
            generate_responsive_images: Vec::new(),
            custom_properties: Map::new(),
            path_prefix: String::new(),
        }
    }
}

impl LibraryOptions {
    pub fn with_default_disk(mut self, disk: impl Into<String>) -> Self {
        self.default_disk = disk.into();
        self
    }

    pub fn with_conversions_disk(mut self, disk: impl Into<String>) -> Self {
        self.conversions_disk = Some(disk.into());
        self
    }

    pub fn with_auto_generate_conversions(mut self, enabled: bool) -> Self {
        self.auto_generate_conversions = enabled;
        self
    }

    pub fn with_conversions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.perform_conversions = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_responsive_images<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generate_responsive_images = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom_properties.insert(key.into(), value);
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Merge per-call overrides over these defaults
    pub fn resolve(&self, overrides: &AddMediaOptions) -> ResolvedOptions {
        let disk = overrides
            .disk
            .clone()
            .unwrap_or_else(|| self.default_disk.clone());

        let conversions_disk = overrides
            .conversions_disk
            .clone()
            .or_else(|| self.conversions_disk.clone())
            .unwrap_or_else(|| disk.clone());

        let mut custom_properties = self.custom_properties.clone();
        for (key, value) in &overrides.custom_properties {
            custom_properties.insert(key.clone(), value.clone());
        }

        ResolvedOptions {
            disk,
            conversions_disk,
            name: overrides.name.clone(),
            owner: overrides.owner.clone(),
            order_column: overrides.order_column,
            auto_generate_conversions: overrides
                .auto_generate_conversions
                .unwrap_or(self.auto_generate_conversions),
            perform_conversions: overrides
                .perform_conversions
                .clone()
                .unwrap_or_else(|| self.perform_conversions.clone()),
            generate_responsive_images: overrides
                .generate_responsive_images
                .clone()
                .unwrap_or_else(|| self.generate_responsive_images.clone()),
            custom_properties,
        }
    }
}

/// Overrides for a single ingestion call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddMediaOptions {
    pub disk: Option<String>,
    pub conversions_disk: Option<String>,
    /// Display name, the source file stem when unset
    pub name: Option<String>,
    pub owner: Option<MediaOwner>,
    pub order_column: Option<i32>,
    pub auto_generate_conversions: Option<bool>,
    pub perform_conversions: Option<Vec<String>>,
    pub generate_responsive_images: Option<Vec<String>>,
    pub custom_properties: Map<String, Value>,
}

impl AddMediaOptions {
    pub fn with_disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = Some(disk.into());
        self
    }

    pub fn with_conversions_disk(mut self, disk: impl Into<String>) -> Self {
        self.conversions_disk = Some(disk.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_owner(mut self, owner_type: impl Into<String>, owner_id: u64) -> Self {
        self.owner = Some(MediaOwner::new(owner_type, owner_id));
        self
    }

    pub fn with_order_column(mut self, order: i32) -> Self {
        self.order_column = Some(order);
        self
    }

    pub fn with_auto_generate_conversions(mut self, enabled: bool) -> Self {
        self.auto_generate_conversions = Some(enabled);
        self
    }

    /// Conversions to generate after ingestion when auto-generation is on
    pub fn with_conversions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.perform_conversions = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_responsive_images<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generate_responsive_images = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_custom_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom_properties.insert(key.into(), value);
        self
    }
}

/// Effective options for one ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub disk: String,
    pub conversions_disk: String,
    pub name: Option<String>,
    pub owner: Option<MediaOwner>,
    pub order_column: Option<i32>,
    pub auto_generate_conversions: bool,
    pub perform_conversions: Vec<String>,
    pub generate_responsive_images: Vec<String>,
    pub custom_properties: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_defaults() {
        let options = LibraryOptions::default();
        let resolved = options.resolve(&AddMediaOptions::default());

        assert_eq!(resolved.disk, "s3");
        assert_eq!(resolved.conversions_disk, "s3");
        assert!(!resolved.auto_generate_conversions);
        assert!(resolved.perform_conversions.is_empty());
        assert!(resolved.custom_properties.is_empty());
    }

    #[test]
    fn test_overrides_replace_scalars_and_lists() {
        let options = LibraryOptions::default()
            .with_conversions_disk("thumbs")
            .with_conversions(["thumbnail", "preview"]);

        let resolved = options.resolve(
            &AddMediaOptions::default()
                .with_disk("local")
                .with_conversions(["preview"]),
        );

        assert_eq!(resolved.disk, "local");
        assert_eq!(resolved.conversions_disk, "thumbs");
        assert!(!resolved.auto_generate_conversions);
        assert_eq!(resolved.perform_conversions, vec!["preview".to_string()]);
    }

    #[test]
    fn test_conversion_builders_leave_auto_flag_alone() {
        let options = LibraryOptions::default()
            .with_auto_generate_conversions(false)
            .with_conversions(["thumbnail"]);
        assert!(!options.auto_generate_conversions);

        let overrides = AddMediaOptions::default()
            .with_auto_generate_conversions(false)
            .with_conversions(["thumbnail"]);
        assert_eq!(overrides.auto_generate_conversions, Some(false));

        let resolved = LibraryOptions::default()
            .with_auto_generate_conversions(true)
            .resolve(&overrides);
        assert!(!resolved.auto_generate_conversions);
        assert_eq!(resolved.perform_conversions, vec!["thumbnail".to_string()]);
    }

    #[test]
    fn test_conversions_disk_follows_effective_disk() {
        let resolved = LibraryOptions::default().resolve(&AddMediaOptions::default().with_disk("local"));
        assert_eq!(resolved.conversions_disk, "local");
    }

    #[test]
    fn test_custom_properties_merge_per_key() {
        let options = LibraryOptions::default()
            .with_custom_property("source", json!("upload"))
            .with_custom_property("alt", json!("default alt"));

        let resolved = options.resolve(
            &AddMediaOptions::default()
                .with_custom_property("alt", json!("sunset"))
                .with_custom_property("width_hint", json!(800)),
        );

        assert_eq!(resolved.custom_properties["source"], json!("upload"));
        assert_eq!(resolved.custom_properties["alt"], json!("sunset"));
        assert_eq!(resolved.custom_properties["width_hint"], json!(800));
        assert_eq!(resolved.custom_properties.len(), 3);
    }

    #[test]
    fn test_deserialize_partial_library_options() {
        let options: LibraryOptions =
            serde_json::from_value(json!({"default_disk": "local", "path_prefix": "media"}))
                .unwrap();

        assert_eq!(options.default_disk, "local");
        assert_eq!(options.path_prefix, "media");
        assert_eq!(options.conversions_disk, None);
    }
}
