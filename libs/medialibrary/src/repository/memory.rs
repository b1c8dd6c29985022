//! In-process repository

use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::Mutex;

use super::{MediaRepository, RepositoryError, RepositoryResult, listing_order};
use crate::models::MediaRecord;

#[derive(Debug, Default)]
struct State {
    last_id: u64,
    records: BTreeMap<u64, MediaRecord>,
}

/// Keeps records in memory and hands out increasing IDs from 1
#[derive(Debug, Clone, Default)]
pub struct InMemoryMediaRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryMediaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn filter<F>(&self, predicate: F) -> Vec<MediaRecord>
    where
        F: Fn(&MediaRecord) -> bool,
    {
        let state = self.state.lock().await;
        let mut records: Vec<MediaRecord> = state
            .records
            .values()
            .filter(|m| predicate(m))
            .cloned()
            .collect();
        records.sort_by(listing_order);
        records
    }
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn save(&self, media: &mut MediaRecord) -> RepositoryResult<()> {
        let mut state = self.state.lock().await;
        media.touch();

        match media.id {
            Some(id) if id != 0 => {
                if !state.records.contains_key(&id) {
                    return Err(RepositoryError::Missing(id));
                }
                state.records.insert(id, media.clone());
            }
            _ => {
                state.last_id += 1;
                let id = state.last_id;
                media.id = Some(id);
                state.records.insert(id, media.clone());
            }
        }

        Ok(())
    }

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MediaRecord>> {
        Ok(self.state.lock().await.records.get(&id).cloned())
    }

    async fn delete(&self, media: &MediaRecord) -> RepositoryResult<()> {
        let id = media.id.ok_or(RepositoryError::Unpersisted)?;
        self.state.lock().await.records.remove(&id);
        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner_type: &str,
        owner_id: u64,
    ) -> RepositoryResult<Vec<MediaRecord>> {
        Ok(self.filter(|m| m.belongs_to(owner_type, owner_id)).await)
    }

    async fn find_by_owner_and_collection(
        &self,
        owner_type: &str,
        owner_id: u64,
        collection: &str,
    ) -> RepositoryResult<Vec<MediaRecord>> {
        Ok(self
            .filter(|m| m.belongs_to(owner_type, owner_id) && m.collection_name == collection)
            .await)
    }

    async fn find_by_collection(&self, collection: &str) -> RepositoryResult<Vec<MediaRecord>> {
        Ok(self.filter(|m| m.collection_name == collection).await)
    }
}
