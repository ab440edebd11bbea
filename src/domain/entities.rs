//! Domain entities mirrored from persistent storage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

/// A single blog post.
///
/// `slug`, `author` and `published` are fixed at creation. Edits replace
/// `title`, `body` and `tags` and refresh `updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: Uuid,
    pub author: String,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub published: OffsetDateTime,
    pub updated: OffsetDateTime,
    pub tags: BTreeSet<String>,
}

impl EntryRecord {
    /// Public key used by the edit and delete endpoints.
    pub fn key(&self) -> String {
        self.id.hyphenated().to_string()
    }

    /// Human readable author name: the local part of an email identity, or
    /// the identity itself when it carries no domain.
    pub fn author_name(&self) -> &str {
        author_nickname(&self.author)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

pub fn author_nickname(author: &str) -> &str {
    match author.split_once('@') {
        Some((local, _)) if !local.is_empty() => local,
        _ => author,
    }
}

/// Parse a public entry key. Malformed keys are indistinguishable from
/// unknown ones to callers.
pub fn parse_entry_key(key: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(key.trim()).map_err(|_| DomainError::not_found("entry"))
}
