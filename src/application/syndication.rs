//! Atom 1.0 feed rendering.
//!
//! Items keep the order of the input slice; callers pass entries already
//! sorted newest first.

use atom_syndication::{Category, Entry, Feed, FixedDateTime, Link, Person, Text};
use chrono::DateTime;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::EntryRecord;

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml; charset=utf-8";

/// Per-deployment feed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMetadata {
    pub title: String,
    /// Absolute site link, e.g. `https://blog.example.com`.
    pub link: String,
    pub description: String,
    pub language: String,
    /// Path prefix of entry permalinks, e.g. `/e/`.
    pub permalink_base: String,
}

impl FeedMetadata {
    /// Relative permalink of `slug`.
    pub fn permalink(&self, slug: &str) -> String {
        format!("{}{}", self.permalink_base, slug)
    }

    /// Absolute permalink of `slug`, used as the item id.
    pub fn absolute_permalink(&self, slug: &str) -> String {
        format!("{}{}", self.link.trim_end_matches('/'), self.permalink(slug))
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("timestamp {0} cannot be represented in the feed")]
    Timestamp(OffsetDateTime),
    #[error("failed to write feed: {0}")]
    Write(#[from] atom_syndication::Error),
}

pub fn render_feed(entries: &[EntryRecord], meta: &FeedMetadata) -> Result<Vec<u8>, FeedError> {
    let items = entries
        .iter()
        .map(|entry| feed_entry(entry, meta))
        .collect::<Result<Vec<_>, _>>()?;

    let updated = match entries.iter().map(|entry| entry.published).max() {
        Some(newest) => to_fixed(newest)?,
        None => to_fixed(OffsetDateTime::now_utc())?,
    };

    let mut feed = Feed::default();
    feed.set_title(meta.title.as_str());
    feed.set_id(meta.link.as_str());
    feed.set_updated(updated);
    feed.set_subtitle(Some(Text::plain(meta.description.as_str())));
    feed.set_lang(Some(meta.language.clone()));
    feed.set_links(vec![alternate_link(&meta.link)]);
    feed.set_entries(items);

    Ok(feed.write_to(Vec::new())?)
}

fn feed_entry(entry: &EntryRecord, meta: &FeedMetadata) -> Result<Entry, FeedError> {
    let published = to_fixed(entry.published)?;

    let mut author = Person::default();
    author.set_name(entry.author_name());

    let categories = entry
        .tags
        .iter()
        .map(|tag| {
            let mut category = Category::default();
            category.set_term(tag.as_str());
            category
        })
        .collect::<Vec<_>>();

    let mut item = Entry::default();
    item.set_title(entry.title.as_str());
    item.set_id(meta.absolute_permalink(&entry.slug));
    item.set_links(vec![alternate_link(&meta.permalink(&entry.slug))]);
    item.set_authors(vec![author]);
    item.set_published(Some(published));
    item.set_updated(published);
    item.set_categories(categories);
    item.set_summary(Some(Text::html(entry.body.as_str())));
    Ok(item)
}

fn alternate_link(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn to_fixed(at: OffsetDateTime) -> Result<FixedDateTime, FeedError> {
    DateTime::from_timestamp(at.unix_timestamp(), at.nanosecond())
        .map(|utc| utc.fixed_offset())
        .ok_or(FeedError::Timestamp(at))
}
