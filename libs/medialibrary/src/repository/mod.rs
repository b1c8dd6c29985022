//! Metadata repository
//!
//! Owner-scoped queries are part of the base contract. Listing a whole
//! collection is optional and reports [`RepositoryError::Unsupported`] when a
//! backend does not offer it.

mod memory;
mod postgres;

pub use memory::InMemoryMediaRepository;
pub use postgres::PgMediaRepository;

use async_trait::async_trait;
use common::error::DatabaseError;
use thiserror::Error;

use crate::models::MediaRecord;

/// Custom error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Failed to encode {field}: {source}")]
    Encode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode media row: {0}")]
    Decode(String),

    /// An update targeted an ID the repository does not hold
    #[error("Media record {0} not found")]
    Missing(u64),

    #[error("Media record has no repository identity")]
    Unpersisted,

    #[error("Operation not supported by this repository: {0}")]
    Unsupported(&'static str),
}

/// Type alias for Result with RepositoryError
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Durable store for media records
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Insert when `media.id` is unset, assigning it; update otherwise
    async fn save(&self, media: &mut MediaRecord) -> RepositoryResult<()>;

    /// `None` when no record has this ID
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MediaRecord>>;

    async fn delete(&self, media: &MediaRecord) -> RepositoryResult<()>;

    /// Records attached to an owner, by `order_column` then ID
    async fn find_by_owner(
        &self,
        owner_type: &str,
        owner_id: u64,
    ) -> RepositoryResult<Vec<MediaRecord>>;

    async fn find_by_owner_and_collection(
        &self,
        owner_type: &str,
        owner_id: u64,
        collection: &str,
    ) -> RepositoryResult<Vec<MediaRecord>>;

    /// Every record in a collection regardless of owner
    async fn find_by_collection(&self, collection: &str) -> RepositoryResult<Vec<MediaRecord>> {
        let _ = collection;
        Err(RepositoryError::Unsupported("find_by_collection"))
    }
}

/// Sort order shared by every listing
pub(crate) fn listing_order(a: &MediaRecord, b: &MediaRecord) -> std::cmp::Ordering {
    let key = |m: &MediaRecord| (m.order_column.is_none(), m.order_column, m.id);
    key(a).cmp(&key(b))
}
