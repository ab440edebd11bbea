//! Entry lifecycle and read paths.
//!
//! Every successful create, update and delete clears the recent-entries
//! cache slot after the store has confirmed the mutation.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::application::forms::{EntryForm, FieldErrors};
use crate::application::pagination::{
    Adjacency, DEFAULT_PAGE_SIZE, MAX_OFFSET, PageOutcome, PageWindow,
};
use crate::application::repos::{
    CreateEntryParams, EntriesRepo, EntryListQuery, RepoError, UpdateEntryParams,
};
use crate::cache::RecentEntriesCache;
use crate::domain::entities::{EntryRecord, parse_entry_key};
use crate::domain::slug::{SlugError, UniqueSlugError, unique_slug};

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct EntryService {
    repo: Arc<dyn EntriesRepo>,
    recent: RecentEntriesCache,
    page_size: u64,
}

impl EntryService {
    pub fn new(repo: Arc<dyn EntriesRepo>, recent: RecentEntriesCache) -> Self {
        Self {
            repo,
            recent,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub async fn create(&self, author: &str, form: &EntryForm) -> Result<EntryRecord, EntryError> {
        let fields = form.validate()?;

        let repo = self.repo.clone();
        let slug = unique_slug(&fields.title, move |candidate| {
            let repo = repo.clone();
            async move {
                repo.find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_some())
            }
        })
        .await
        .map_err(|err| match err {
            UniqueSlugError::Slug(SlugError::Exhausted { .. }) => EntryError::Validation(
                FieldErrors::single("title", "Too many entries already use this title."),
            ),
            UniqueSlugError::Slug(_) => EntryError::Validation(FieldErrors::single(
                "title",
                "Title must contain at least one letter or digit.",
            )),
            UniqueSlugError::Lookup(err) => EntryError::Repo(err),
        })?;

        let entry = self
            .repo
            .create_entry(CreateEntryParams {
                author: author.to_string(),
                title: fields.title,
                slug,
                body: fields.body,
                tags: fields.tags,
            })
            .await?;

        self.recent.invalidate().await;
        counter!("gazette_entries_mutation_total", "kind" => "create").increment(1);
        info!(
            target = "gazette::entries",
            id = %entry.id,
            slug = %entry.slug,
            author = %entry.author,
            "entry created"
        );
        Ok(entry)
    }

    /// Replace title, body and tags of the entry behind `key`. The slug keeps
    /// the value derived at creation.
    pub async fn update(&self, key: &str, form: &EntryForm) -> Result<EntryRecord, EntryError> {
        let id = parse_entry_key(key).map_err(|_| EntryError::NotFound)?;
        let fields = form.validate()?;

        let entry = self
            .repo
            .update_entry(UpdateEntryParams {
                id,
                title: fields.title,
                body: fields.body,
                tags: fields.tags,
            })
            .await?
            .ok_or(EntryError::NotFound)?;

        self.recent.invalidate().await;
        counter!("gazette_entries_mutation_total", "kind" => "update").increment(1);
        info!(
            target = "gazette::entries",
            id = %entry.id,
            slug = %entry.slug,
            "entry updated"
        );
        Ok(entry)
    }

    /// Hard-delete the entry behind `key`. Unknown and malformed keys report
    /// `false`.
    pub async fn delete(&self, key: &str) -> Result<bool, EntryError> {
        let Ok(id) = parse_entry_key(key) else {
            return Ok(false);
        };

        let removed = self.repo.delete_entry(id).await?;
        if removed {
            self.recent.invalidate().await;
            counter!("gazette_entries_mutation_total", "kind" => "delete").increment(1);
            info!(target = "gazette::entries", id = %id, "entry deleted");
        }
        Ok(removed)
    }

    pub async fn get_by_key(&self, key: &str) -> Result<EntryRecord, EntryError> {
        let id = parse_entry_key(key).map_err(|_| EntryError::NotFound)?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(EntryError::NotFound)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<EntryRecord, EntryError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or(EntryError::NotFound)
    }

    /// Newest entries through the recent-entries cache slot.
    pub async fn recent_entries(&self) -> Result<Vec<EntryRecord>, EntryError> {
        let repo = self.repo.clone();
        self.recent
            .get_or_compute(|limit| async move {
                repo.list_entries(&EntryListQuery::recent(limit))
                    .await
                    .map_err(EntryError::from)
            })
            .await
    }

    pub async fn list_recent(&self, limit: u64) -> Result<Vec<EntryRecord>, EntryError> {
        Ok(self
            .repo
            .list_entries(&EntryListQuery::recent(limit))
            .await?)
    }

    pub async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<EntryRecord>, EntryError> {
        Ok(self
            .repo
            .list_entries(&EntryListQuery::page(offset, limit))
            .await?)
    }

    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<EntryRecord>, EntryError> {
        Ok(self.repo.list_entries(&EntryListQuery::tagged(tag)).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<EntryRecord>, EntryError> {
        Ok(self.repo.list_entries(&EntryListQuery::all()).await?)
    }

    pub async fn count(&self, tag: Option<&str>) -> Result<u64, EntryError> {
        Ok(self.repo.count_entries(tag).await?)
    }

    /// Main listing page starting at `offset`. Offsets past the store's
    /// range cannot hold rows and send the reader back to the front.
    pub async fn page(&self, offset: u64) -> Result<PageOutcome, EntryError> {
        if offset > MAX_OFFSET {
            return Ok(PageOutcome::RedirectToFirst);
        }
        let window = PageWindow::new(offset, self.page_size);
        let rows = self
            .list_page(window.offset, window.page_size.saturating_add(1))
            .await?;
        Ok(PageOutcome::from_rows(rows, window))
    }

    pub async fn neighbors(&self, entry: &EntryRecord) -> Result<Adjacency, EntryError> {
        Ok(self.repo.find_neighbors(entry.published).await?.into())
    }

    pub async fn health_check(&self) -> Result<(), RepoError> {
        self.repo.health_check().await
    }

    /// Entry behind a permalink together with its publish-time neighbors.
    pub async fn permalink(&self, slug: &str) -> Result<(EntryRecord, Adjacency), EntryError> {
        let entry = self.get_by_slug(slug).await?;
        let adjacency = self.neighbors(&entry).await?;
        Ok((entry, adjacency))
    }
}
