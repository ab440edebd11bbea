//! Repository traits describing persistence adapters.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::EntryRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Listing query. Results are always ordered by `published` descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryListQuery {
    pub tag: Option<String>,
    pub offset: u64,
    /// `None` returns every matching entry.
    pub limit: Option<u64>,
}

impl EntryListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn recent(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn page(offset: u64, limit: u64) -> Self {
        Self {
            tag: None,
            offset,
            limit: Some(limit),
        }
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateEntryParams {
    pub author: String,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateEntryParams {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
}

/// Entries immediately around a publish time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    /// Latest entry published strictly before the pivot.
    pub previous: Option<EntryRecord>,
    /// Earliest entry published strictly after the pivot.
    pub next: Option<EntryRecord>,
}

#[async_trait]
pub trait EntriesRepo: Send + Sync {
    async fn create_entry(&self, params: CreateEntryParams) -> Result<EntryRecord, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EntryRecord>, RepoError>;

    /// First entry (by publish time) carrying `slug`.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<EntryRecord>, RepoError>;

    async fn list_entries(&self, query: &EntryListQuery) -> Result<Vec<EntryRecord>, RepoError>;

    async fn count_entries(&self, tag: Option<&str>) -> Result<u64, RepoError>;

    async fn find_neighbors(&self, published: OffsetDateTime) -> Result<Neighbors, RepoError>;

    /// Replace title, body and tags. Returns `None` when `id` is unknown.
    async fn update_entry(&self, params: UpdateEntryParams)
    -> Result<Option<EntryRecord>, RepoError>;

    /// Returns whether an entry was removed.
    async fn delete_entry(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}
