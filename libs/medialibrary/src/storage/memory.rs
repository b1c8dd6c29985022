//! In-memory disk for tests and throwaway setups

use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    io::Cursor,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::io::AsyncReadExt;

use super::{ObjectReader, SaveOptions, Storage, StorageError, StorageResult};

/// A stored object and the options it was saved with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub options: SaveOptions,
}

/// Keeps objects in a shared map; clones see the same objects
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
    base_url: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(format!("{}/", base_url.into().trim_end_matches('/')));
        self
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Stored keys, sorted
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(
        &self,
        path: &str,
        mut contents: ObjectReader,
        options: &SaveOptions,
    ) -> StorageResult<()> {
        let mut data = Vec::new();
        contents.read_to_end(&mut data).await?;

        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                path.to_string(),
                StoredObject {
                    data,
                    options: options.clone(),
                },
            );
        Ok(())
    }

    async fn get(&self, path: &str) -> StorageResult<ObjectReader> {
        let object = self
            .object(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(Box::pin(Cursor::new(object.data)))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.object(path).is_some())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}", base, path),
            None => String::new(),
        }
    }
}
