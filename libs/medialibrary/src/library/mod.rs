//! Media orchestrator
//!
//! [`MediaLibrary`] ties disks, the repository, the transformer and the path
//! layout together. Every operation runs its steps in order on the calling
//! task; CPU-bound decoding and encoding move to the blocking pool.
//!
//! Multi-step operations do not roll back: a failure after the record was
//! saved leaves that record behind.

mod add;
mod conversions;
mod transfer;
mod urls;

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::{
    conversion::Transformer,
    error::{MediaError, MediaResult},
    mime,
    models::MediaRecord,
    options::LibraryOptions,
    path::{DefaultPathGenerator, PathGenerator},
    repository::MediaRepository,
    storage::{DiskManager, Storage},
};

/// Entry point for every media operation
#[derive(Clone)]
pub struct MediaLibrary {
    disks: Arc<DiskManager>,
    transformer: Arc<dyn Transformer>,
    repository: Arc<dyn MediaRepository>,
    options: LibraryOptions,
    paths: Arc<dyn PathGenerator>,
}

impl MediaLibrary {
    pub fn new(
        disks: Arc<DiskManager>,
        transformer: Arc<dyn Transformer>,
        repository: Arc<dyn MediaRepository>,
        options: LibraryOptions,
    ) -> Self {
        let paths = Arc::new(DefaultPathGenerator::new(options.path_prefix.clone()));

        Self {
            disks,
            transformer,
            repository,
            options,
            paths,
        }
    }

    /// Replace the default `{prefix}/{id}/` layout
    pub fn with_path_generator(mut self, paths: Arc<dyn PathGenerator>) -> Self {
        self.paths = paths;
        self
    }

    pub fn disks(&self) -> &Arc<DiskManager> {
        &self.disks
    }

    pub fn transformer(&self) -> &Arc<dyn Transformer> {
        &self.transformer
    }

    pub fn repository(&self) -> &Arc<dyn MediaRepository> {
        &self.repository
    }

    pub fn options(&self) -> &LibraryOptions {
        &self.options
    }

    pub fn paths(&self) -> &Arc<dyn PathGenerator> {
        &self.paths
    }

    pub async fn find_media(&self, id: u64) -> MediaResult<Option<MediaRecord>> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Every record attached to an owner
    pub async fn media_for_model(
        &self,
        owner_type: &str,
        owner_id: u64,
    ) -> MediaResult<Vec<MediaRecord>> {
        Ok(self.repository.find_by_owner(owner_type, owner_id).await?)
    }

    /// Records attached to an owner within one collection
    pub async fn media_for_model_and_collection(
        &self,
        owner_type: &str,
        owner_id: u64,
        collection: &str,
    ) -> MediaResult<Vec<MediaRecord>> {
        Ok(self
            .repository
            .find_by_owner_and_collection(owner_type, owner_id, collection)
            .await?)
    }

    /// Records in a collection across owners, if the repository supports it
    pub async fn media_in_collection(&self, collection: &str) -> MediaResult<Vec<MediaRecord>> {
        Ok(self.repository.find_by_collection(collection).await?)
    }

    fn disk(&self, name: &str) -> MediaResult<Arc<dyn Storage>> {
        Ok(self.disks.get(name)?)
    }

    async fn persist(&self, media: &mut MediaRecord) -> MediaResult<()> {
        self.repository.save(media).await?;
        debug!(media_id = ?media.id, "Saved media record");
        Ok(())
    }

    /// Size and detected MIME type of a stored object
    async fn inspect_object(
        &self,
        storage: &Arc<dyn Storage>,
        path: &str,
        file_name: &str,
    ) -> MediaResult<(u64, &'static str)> {
        let reader = storage.get(path).await?;
        let (size, head) = measure(reader).await?;
        let mime_type = mime::detect(&head, file_name);

        info!(path, size, mime_type, "Inspected stored object");
        Ok((size, mime_type))
    }
}

impl std::fmt::Debug for MediaLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLibrary")
            .field("disks", &self.disks)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Count the bytes of a stream, keeping the leading bytes for sniffing
async fn measure<R>(mut reader: R) -> MediaResult<(u64, Vec<u8>)>
where
    R: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(mime::SNIFF_LEN);
    let mut buffer = vec![0u8; 64 * 1024];
    let mut size = 0u64;

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        if head.len() < mime::SNIFF_LEN {
            let wanted = (mime::SNIFF_LEN - head.len()).min(read);
            head.extend_from_slice(&buffer[..wanted]);
        }
        size += read as u64;
    }

    Ok((size, head))
}

/// Last path segment usable as a stored file name
fn file_name_from(path: &str) -> MediaResult<String> {
    let name = path.rsplit('/').next().unwrap_or_default().trim();

    match name {
        "" | "." | ".." => Err(MediaError::InvalidSource(format!(
            "cannot derive a file name from {}",
            path
        ))),
        name => Ok(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_measure_counts_and_keeps_head() {
        let data = vec![7u8; 200_000];
        let (size, head) = measure(&data[..]).await.unwrap();

        assert_eq!(size, 200_000);
        assert_eq!(head.len(), mime::SNIFF_LEN);
    }

    #[test]
    fn test_file_name_from() {
        assert_eq!(file_name_from("images/photo.png").unwrap(), "photo.png");
        assert_eq!(file_name_from("photo.png").unwrap(), "photo.png");
        assert!(file_name_from("images/").is_err());
        assert!(file_name_from("a/..").is_err());
    }
}
