//! Media attachment library
//!
//! Stores original files on pluggable storage disks, records their metadata
//! in a repository, and derives conversions and responsive width variants
//! through a pluggable image transformer. Media records are attached to
//! arbitrary owner models through a `(type, id)` pair and grouped into named
//! collections.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use medialibrary::{
//!     AddMediaOptions, DiskManager, ImageTransformer, InMemoryMediaRepository, LibraryOptions,
//!     LocalStorage, MediaLibrary,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let disks = DiskManager::new();
//!     disks.add("local", Arc::new(LocalStorage::new("/var/media", None)?));
//!
//!     let library = MediaLibrary::new(
//!         Arc::new(disks),
//!         Arc::new(ImageTransformer::with_defaults()),
//!         Arc::new(InMemoryMediaRepository::new()),
//!         LibraryOptions::default().with_default_disk("local"),
//!     );
//!
//!     let media = library
//!         .add_media_from_file(
//!             "photo.png",
//!             "gallery",
//!             AddMediaOptions::default()
//!                 .with_auto_generate_conversions(true)
//!                 .with_conversions(["thumbnail"]),
//!         )
//!         .await?;
//!     println!("{}", library.url_for_conversion(&media, "thumbnail"));
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod conversion;
pub mod error;
pub mod library;
pub mod mime;
pub mod models;
pub mod options;
pub mod path;
pub mod repository;
pub mod settings;
pub mod storage;

pub use conversion::{
    Fit, ImageTransformer, Orientation, ResponsiveRecipe, TransformError, TransformOptions,
    Transformer,
};
pub use error::{MediaError, MediaResult};
pub use library::MediaLibrary;
pub use models::{MediaOwner, MediaRecord, ResponsiveWidths};
pub use options::{AddMediaOptions, LibraryOptions};
pub use path::{DefaultPathGenerator, PathGenerator};
pub use repository::{
    InMemoryMediaRepository, MediaRepository, PgMediaRepository, RepositoryError,
};
pub use settings::Settings;
pub use storage::{
    DiskManager, LocalStorage, MemoryStorage, S3Storage, SaveOptions, Storage, StorageError,
    Visibility,
};
