//! Storage gateway
//!
//! A [`Storage`] is a blob store addressed by slash-separated keys. Backends
//! are registered under a logical disk name in a [`DiskManager`].

mod local;
mod memory;
mod s3;

pub use local::LocalStorage;
pub use memory::{MemoryStorage, StoredObject};
pub use s3::{S3Config, S3Storage};

use async_trait::async_trait;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    io,
    pin::Pin,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Streamed object body
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Timeout for fetching remote sources
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Custom error type for storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    /// No backend is registered under the requested disk name
    #[error("Disk not found: {0}")]
    DiskNotFound(String),

    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// Error reported by a remote storage service
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;

/// Object visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Attributes stored alongside an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub visibility: Visibility,
    pub metadata: HashMap<String, String>,
}

impl SaveOptions {
    /// Publicly readable object
    pub fn public() -> Self {
        Self {
            visibility: Visibility::Public,
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Blob store contract shared by every disk
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `contents` at `path`, replacing any existing object
    async fn save(&self, path: &str, contents: ObjectReader, options: &SaveOptions)
    -> StorageResult<()>;

    /// Fetch `url` and store the body at `path`
    ///
    /// The response `Content-Type` is used when `options` has none.
    async fn save_from_url(&self, path: &str, url: &str, options: &SaveOptions) -> StorageResult<()> {
        let (body, content_type) = fetch_url(url).await?;

        let mut options = options.clone();
        if options.content_type.is_none() {
            options.content_type = content_type;
        }

        self.save(path, body, &options).await
    }

    /// Open the object at `path`, [`StorageError::NotFound`] when absent
    async fn get(&self, path: &str) -> StorageResult<ObjectReader>;

    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Remove the object; removing a missing object succeeds
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Public URL, empty when the backend cannot produce one
    fn url(&self, path: &str) -> String;

    /// Time-limited URL; backends without signing return [`Storage::url`]
    async fn temporary_url(&self, path: &str, expires_in: Duration) -> StorageResult<String> {
        let _ = expires_in;
        Ok(self.url(path))
    }
}

/// Stream the body of `url`, returning it with the response content type
pub async fn fetch_url(url: &str) -> StorageResult<(ObjectReader, Option<String>)> {
    debug!("Fetching remote object: {}", url);

    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(StorageError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let stream = response.bytes_stream().map_err(io::Error::other);
    let reader: ObjectReader = Box::pin(StreamReader::new(stream));

    Ok((reader, content_type))
}

/// Named storage backends
#[derive(Default)]
pub struct DiskManager {
    disks: RwLock<HashMap<String, Arc<dyn Storage>>>,
}

impl DiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `storage` under `name`, replacing a previous registration
    pub fn add(&self, name: impl Into<String>, storage: Arc<dyn Storage>) {
        let name = name.into();
        debug!("Registering disk: {}", name);
        self.disks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, storage);
    }

    pub fn get(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        self.disks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::DiskNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.disks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn Storage>> {
        self.disks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Registered disk names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .disks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("disks", &self.names())
            .finish()
    }
}
