//! Local filesystem disk

use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

use super::{ObjectReader, SaveOptions, Storage, StorageError, StorageResult};

/// Stores objects as files below a root directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: Option<String>,
}

impl LocalStorage {
    /// Create a disk rooted at `root`, serving URLs below `base_url` when given
    pub fn new(root: impl Into<PathBuf>, base_url: Option<String>) -> StorageResult<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(StorageError::InvalidConfig(
                "local disk requires a base path".to_string(),
            ));
        }

        let base_url = base_url
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}/", url.trim_end_matches('/')));

        Ok(Self { root, base_url })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage key below the root, refusing anything that would escape it
    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let mut resolved = self.root.clone();
        let mut depth = 0;

        for component in Path::new(path).components() {
            match component {
                Component::Normal(segment) => {
                    resolved.push(segment);
                    depth += 1;
                }
                Component::CurDir | Component::RootDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidPath(path.to_string()));
                }
            }
        }

        if depth == 0 {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(resolved)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(
        &self,
        path: &str,
        mut contents: ObjectReader,
        _options: &SaveOptions,
    ) -> StorageResult<()> {
        let target = self.resolve(path)?;
        let parent = target
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        fs::create_dir_all(parent).await?;

        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let written = async {
            let mut file = fs::File::create(&temp).await?;
            tokio::io::copy(&mut contents, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&temp, &target).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!("Stored local object: {}", target.display());
        Ok(())
    }

    async fn get(&self, path: &str) -> StorageResult<ObjectReader> {
        let target = self.resolve(path)?;
        match fs::File::open(&target).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let target = self.resolve(path)?;
        match fs::metadata(&target).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}", base, path.trim_start_matches('/')),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn reader(bytes: &'static [u8]) -> ObjectReader {
        Box::pin(bytes)
    }

    #[test]
    fn test_empty_root_is_rejected() {
        assert!(matches!(
            LocalStorage::new("", None),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_save_get_exists_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).unwrap();

        assert!(!storage.exists("1/photo.png").await.unwrap());

        storage
            .save("1/photo.png", reader(b"pixels"), &SaveOptions::default())
            .await
            .unwrap();
        assert!(storage.exists("1/photo.png").await.unwrap());
        assert!(dir.path().join("1").join("photo.png").is_file());

        let mut body = Vec::new();
        storage
            .get("1/photo.png")
            .await
            .unwrap()
            .read_to_end(&mut body)
            .await
            .unwrap();
        assert_eq!(body, b"pixels");

        storage.delete("1/photo.png").await.unwrap();
        assert!(!storage.exists("1/photo.png").await.unwrap());
        storage.delete("1/photo.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_save_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).unwrap();

        storage
            .save("a.txt", reader(b"first"), &SaveOptions::default())
            .await
            .unwrap();
        storage
            .save("a.txt", reader(b"second"), &SaveOptions::default())
            .await
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).unwrap();

        assert!(matches!(
            storage.get("nope.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).unwrap();

        assert!(matches!(
            storage.exists("../etc/passwd").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.delete("").await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_url() {
        let private = LocalStorage::new("/srv/media", None).unwrap();
        assert_eq!(private.url("1/photo.png"), "");

        let public =
            LocalStorage::new("/srv/media", Some("https://cdn.example.com/media".to_string()))
                .unwrap();
        assert_eq!(
            public.url("1/photo.png"),
            "https://cdn.example.com/media/1/photo.png"
        );
    }

    #[tokio::test]
    async fn test_temporary_url_falls_back_to_url() {
        let storage =
            LocalStorage::new("/srv/media", Some("https://cdn.example.com/".to_string())).unwrap();

        let url = storage
            .temporary_url("1/photo.png", std::time::Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/1/photo.png");
    }
}
