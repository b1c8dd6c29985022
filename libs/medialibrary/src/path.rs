//! Storage key derivation for originals and derived artifacts
//!
//! Keys are rooted at `{prefix}/{id}/`, so a record must be saved before any
//! of its files can be placed.

use crate::{error::MediaResult, models::MediaRecord};

/// Maps a media record to its storage keys
pub trait PathGenerator: Send + Sync {
    /// Key of the original file
    fn path(&self, media: &MediaRecord) -> MediaResult<String>;

    /// Key of a named conversion
    fn path_for_conversion(&self, media: &MediaRecord, conversion: &str) -> MediaResult<String>;

    /// Key of one responsive width of a recipe
    fn path_for_responsive_image(
        &self,
        media: &MediaRecord,
        conversion: &str,
        width: u32,
    ) -> MediaResult<String>;
}

/// `{prefix}/{id}/...` layout
#[derive(Debug, Clone, Default)]
pub struct DefaultPathGenerator {
    prefix: String,
}

impl DefaultPathGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn base_path(&self, media: &MediaRecord) -> MediaResult<String> {
        let id = media.require_id()?;
        Ok(clean_key(&format!("{}/{}", self.prefix, id)))
    }
}

impl PathGenerator for DefaultPathGenerator {
    fn path(&self, media: &MediaRecord) -> MediaResult<String> {
        let base = self.base_path(media)?;
        Ok(clean_key(&format!("{}/{}", base, media.file_name)))
    }

    fn path_for_conversion(&self, media: &MediaRecord, conversion: &str) -> MediaResult<String> {
        let base = self.base_path(media)?;
        let (stem, ext) = split_file_name(&media.file_name);
        Ok(clean_key(&format!(
            "{base}/{conversion}/conversions/{stem}-{conversion}{ext}"
        )))
    }

    fn path_for_responsive_image(
        &self,
        media: &MediaRecord,
        conversion: &str,
        width: u32,
    ) -> MediaResult<String> {
        let base = self.base_path(media)?;
        let (stem, ext) = split_file_name(&media.file_name);
        Ok(clean_key(&format!(
            "{base}/{conversion}/responsive-images/{stem}-{conversion}-{width}{ext}"
        )))
    }
}

/// Normalise a slash-separated key: no leading slash, no empty or `.` segments,
/// `..` pops the previous segment and never escapes the root
pub fn clean_key(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Split a file name into stem and extension (with its dot)
///
/// A leading dot does not start an extension, so `.env` has none.
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

pub fn file_stem(file_name: &str) -> &str {
    split_file_name(file_name).0
}

/// Lower-cased extension without the dot
pub fn extension(file_name: &str) -> String {
    split_file_name(file_name)
        .1
        .trim_start_matches('.')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;

    fn record(id: Option<u64>, file_name: &str) -> MediaRecord {
        let mut media = MediaRecord::new(file_name, "local");
        media.id = id;
        media
    }

    #[test]
    fn test_original_path() {
        let paths = DefaultPathGenerator::default();
        let media = record(Some(42), "photo.jpg");

        assert_eq!(paths.path(&media).unwrap(), "42/photo.jpg");
    }

    #[test]
    fn test_paths_are_deterministic() {
        let paths = DefaultPathGenerator::new("uploads");
        let media = record(Some(42), "photo.jpg");

        let first = paths.path(&media).unwrap();
        assert_eq!(first, paths.path(&media).unwrap());
        assert_eq!(first, "uploads/42/photo.jpg");
    }

    #[test]
    fn test_conversion_path_inserts_segment_and_suffix() {
        let paths = DefaultPathGenerator::default();
        let media = record(Some(42), "photo.jpg");

        let original = paths.path(&media).unwrap();
        let conversion = paths.path_for_conversion(&media, "thumb").unwrap();

        assert_eq!(conversion, "42/thumb/conversions/photo-thumb.jpg");
        assert_eq!(
            conversion
                .replace("thumb/conversions/", "")
                .replace("-thumb", ""),
            original
        );
    }

    #[test]
    fn test_responsive_path() {
        let paths = DefaultPathGenerator::new("/media/");
        let media = record(Some(7), "banner.png");

        assert_eq!(
            paths
                .path_for_responsive_image(&media, "responsive", 640)
                .unwrap(),
            "media/7/responsive/responsive-images/banner-responsive-640.png"
        );
    }

    #[test]
    fn test_unpersisted_record_has_no_path() {
        let paths = DefaultPathGenerator::default();

        assert!(matches!(
            paths.path(&record(None, "photo.jpg")),
            Err(MediaError::Unpersisted)
        ));
        assert!(matches!(
            paths.path_for_conversion(&record(Some(0), "photo.jpg"), "thumb"),
            Err(MediaError::Unpersisted)
        ));
    }

    #[test]
    fn test_clean_key() {
        assert_eq!(clean_key("/a//b/./c/"), "a/b/c");
        assert_eq!(clean_key("a/b/../c"), "a/c");
        assert_eq!(clean_key("../../a"), "a");
        assert_eq!(clean_key(""), "");
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(split_file_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_file_name("README"), ("README", ""));
        assert_eq!(split_file_name(".env"), (".env", ""));
        assert_eq!(extension("Photo.PNG"), "png");
    }
}
