//! In-process entry store used when no database is configured.

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::repos::{
    CreateEntryParams, EntriesRepo, EntryListQuery, Neighbors, RepoError, UpdateEntryParams,
};
use crate::domain::entities::EntryRecord;

const SLUG_CONSTRAINT: &str = "entries_slug_key";

/// Entries kept in creation order, which is also ascending `published` order.
#[derive(Debug, Default)]
pub struct MemoryRepositories {
    entries: RwLock<Vec<EntryRecord>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl EntriesRepo for MemoryRepositories {
    async fn create_entry(&self, params: CreateEntryParams) -> Result<EntryRecord, RepoError> {
        let mut entries = self.entries.write().await;

        if entries.iter().any(|entry| entry.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: SLUG_CONSTRAINT.to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let published = match entries.last() {
            Some(last) if now <= last.published => last.published + Duration::microseconds(1),
            _ => now,
        };

        let entry = EntryRecord {
            id: Uuid::new_v4(),
            author: params.author,
            title: params.title,
            slug: params.slug,
            body: params.body,
            published,
            updated: published,
            tags: params.tags,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EntryRecord>, RepoError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|entry| entry.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<EntryRecord>, RepoError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|entry| entry.slug == slug).cloned())
    }

    async fn list_entries(&self, query: &EntryListQuery) -> Result<Vec<EntryRecord>, RepoError> {
        let entries = self.entries.read().await;
        let matching = entries
            .iter()
            .rev()
            .filter(|entry| query.tag.as_deref().map_or(true, |tag| entry.has_tag(tag)))
            .skip(to_usize(query.offset));

        let listed = match query.limit {
            Some(limit) => matching.take(to_usize(limit)).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(listed)
    }

    async fn count_entries(&self, tag: Option<&str>) -> Result<u64, RepoError> {
        let entries = self.entries.read().await;
        let count = entries
            .iter()
            .filter(|entry| tag.map_or(true, |tag| entry.has_tag(tag)))
            .count();
        Ok(count as u64)
    }

    async fn find_neighbors(&self, published: OffsetDateTime) -> Result<Neighbors, RepoError> {
        let entries = self.entries.read().await;
        let previous = entries
            .iter()
            .filter(|entry| entry.published < published)
            .max_by_key(|entry| entry.published)
            .cloned();
        let next = entries
            .iter()
            .filter(|entry| entry.published > published)
            .min_by_key(|entry| entry.published)
            .cloned();
        Ok(Neighbors { previous, next })
    }

    async fn update_entry(
        &self,
        params: UpdateEntryParams,
    ) -> Result<Option<EntryRecord>, RepoError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == params.id) else {
            return Ok(None);
        };

        entry.title = params.title;
        entry.body = params.body;
        entry.tags = params.tags;
        entry.updated = OffsetDateTime::now_utc().max(entry.updated);
        Ok(Some(entry.clone()))
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut entries = self.entries.write().await;
        match entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                entries.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
