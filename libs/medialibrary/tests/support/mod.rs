//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    http::{StatusCode, header},
    routing::get,
};
use common::error::DatabaseError;
use image::{DynamicImage, Rgba, RgbaImage};
use medialibrary::{
    DiskManager, ImageTransformer, InMemoryMediaRepository, LibraryOptions, MediaLibrary,
    MediaRecord, MediaRepository, MemoryStorage, RepositoryError, Storage, Transformer,
    conversion::{ConversionFn, DerivedCodec, ResponsiveRecipe, TransformError, TransformOptions},
    repository::RepositoryResult,
    storage::{ObjectReader, SaveOptions, StorageResult},
};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::task::JoinHandle;

pub const PUBLIC_BASE_URL: &str = "https://media.test";

/// Solid-colour PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([200, 40, 40, 255]),
    ));

    let mut bytes = Vec::new();
    DerivedCodec::Png.encode(&image, &mut bytes).unwrap();
    bytes
}

/// HTTP server serving fixture files on localhost
///
/// - `/photo.png`, `/download` and `/files/*`: a 10x10 PNG
/// - `/slow.png`: answers after a minute
/// - anything else: 404
pub struct FixtureServer {
    base_url: String,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    pub async fn start() -> Self {
        let png = Bytes::from(png_bytes(10, 10));
        let download = png.clone();
        let files = png.clone();

        let app = Router::new()
            .route(
                "/photo.png",
                get(move || {
                    let body = png.clone();
                    async move { ([(header::CONTENT_TYPE, "image/png")], body) }
                }),
            )
            .route(
                "/download",
                get(move || {
                    let body = download.clone();
                    async move { ([(header::CONTENT_TYPE, "application/octet-stream")], body) }
                }),
            )
            .route(
                "/files/*name",
                get(move || {
                    let body = files.clone();
                    async move { ([(header::CONTENT_TYPE, "image/png")], body) }
                }),
            )
            .route(
                "/slow.png",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    StatusCode::NO_CONTENT
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", address),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Memory disks `public` (with a base URL) and `archive`, plus the library
pub struct TestLibrary {
    pub library: MediaLibrary,
    pub repository: InMemoryMediaRepository,
    pub public: MemoryStorage,
    pub archive: MemoryStorage,
}

pub fn test_library(options: LibraryOptions) -> TestLibrary {
    test_library_with(options, Arc::new(ImageTransformer::with_defaults()))
}

pub fn test_library_with(options: LibraryOptions, transformer: Arc<dyn Transformer>) -> TestLibrary {
    let public = MemoryStorage::new().with_base_url(PUBLIC_BASE_URL);
    let archive = MemoryStorage::new();

    let disks = DiskManager::new();
    disks.add("public", Arc::new(public.clone()));
    disks.add("archive", Arc::new(archive.clone()));

    let repository = InMemoryMediaRepository::new();
    let library = MediaLibrary::new(
        Arc::new(disks),
        transformer,
        Arc::new(repository.clone()),
        options,
    );

    TestLibrary {
        library,
        repository,
        public,
        archive,
    }
}

pub fn public_options() -> LibraryOptions {
    LibraryOptions::default().with_default_disk("public")
}

/// Store `bytes` as the original of a fresh record on the `public` disk
pub async fn seed_media(test: &TestLibrary, file_name: &str, bytes: Vec<u8>) -> MediaRecord {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(file_name);
    tokio::fs::write(&file, bytes).await.unwrap();

    test.library
        .add_media_from_file(&file, "gallery", Default::default())
        .await
        .unwrap()
}

/// Wraps the default transformer, counting calls and failing chosen conversions
pub struct CountingTransformer {
    inner: ImageTransformer,
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl CountingTransformer {
    pub fn new() -> Self {
        Self {
            inner: ImageTransformer::with_defaults(),
            calls: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Register `name` as a conversion that always errors
    pub fn fail(&self, name: &str) {
        self.inner
            .register_resize(name, TransformOptions::new().with_size(10, 10));
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transformer for CountingTransformer {
    fn transform(
        &self,
        image: &DynamicImage,
        conversion: &str,
        options: &TransformOptions,
    ) -> Result<DynamicImage, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(conversion) {
            return Err(TransformError::InvalidOption(format!(
                "{} is set up to fail",
                conversion
            )));
        }
        self.inner.transform(image, conversion, options)
    }

    fn has_conversion(&self, conversion: &str) -> bool {
        self.inner.has_conversion(conversion)
    }

    fn register_conversion(&self, name: &str, conversion: ConversionFn) {
        self.inner.register_conversion(name, conversion);
    }

    fn register_responsive_recipe(&self, name: &str, widths: Vec<u32>, options: TransformOptions) {
        self.inner.register_responsive_recipe(name, widths, options);
    }

    fn responsive_recipe(&self, name: &str) -> Option<ResponsiveRecipe> {
        self.inner.responsive_recipe(name)
    }
}

/// Memory disk counting every write attempt
#[derive(Clone, Default)]
pub struct CountingStorage {
    pub inner: MemoryStorage,
    saves: Arc<AtomicUsize>,
}

impl CountingStorage {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for CountingStorage {
    async fn save(
        &self,
        path: &str,
        contents: ObjectReader,
        options: &SaveOptions,
    ) -> StorageResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(path, contents, options).await
    }

    async fn save_from_url(&self, path: &str, url: &str, options: &SaveOptions) -> StorageResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_from_url(path, url, options).await
    }

    async fn get(&self, path: &str) -> StorageResult<ObjectReader> {
        self.inner.get(path).await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.inner.exists(path).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    fn url(&self, path: &str) -> String {
        self.inner.url(path)
    }
}

/// Memory disk whose writes never finish for keys containing a marker
#[derive(Clone)]
pub struct HangingStorage {
    pub inner: MemoryStorage,
    marker: String,
}

impl HangingStorage {
    pub fn new(marker: &str) -> Self {
        Self {
            inner: MemoryStorage::new(),
            marker: marker.to_string(),
        }
    }
}

#[async_trait]
impl Storage for HangingStorage {
    async fn save(
        &self,
        path: &str,
        contents: ObjectReader,
        options: &SaveOptions,
    ) -> StorageResult<()> {
        if path.contains(&self.marker) {
            std::future::pending::<()>().await;
        }
        self.inner.save(path, contents, options).await
    }

    async fn get(&self, path: &str) -> StorageResult<ObjectReader> {
        self.inner.get(path).await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.inner.exists(path).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    fn url(&self, path: &str) -> String {
        self.inner.url(path)
    }
}

/// Repository whose saves always fail
pub struct UnavailableRepository;

fn unavailable() -> RepositoryError {
    RepositoryError::Database(DatabaseError::Configuration(
        "repository unavailable".to_string(),
    ))
}

#[async_trait]
impl MediaRepository for UnavailableRepository {
    async fn save(&self, _media: &mut MediaRecord) -> RepositoryResult<()> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _id: u64) -> RepositoryResult<Option<MediaRecord>> {
        Ok(None)
    }

    async fn delete(&self, _media: &MediaRecord) -> RepositoryResult<()> {
        Err(unavailable())
    }

    async fn find_by_owner(
        &self,
        _owner_type: &str,
        _owner_id: u64,
    ) -> RepositoryResult<Vec<MediaRecord>> {
        Ok(Vec::new())
    }

    async fn find_by_owner_and_collection(
        &self,
        _owner_type: &str,
        _owner_id: u64,
        _collection: &str,
    ) -> RepositoryResult<Vec<MediaRecord>> {
        Ok(Vec::new())
    }
}
