//! Offset pagination and publish-time adjacency.

use serde::Serialize;

use crate::application::repos::Neighbors;
use crate::domain::entities::EntryRecord;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest offset a store can address; stores index rows with `i64`.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Offsets for the page starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub offset: u64,
    pub page_size: u64,
    /// Offset of the newer page; collapses to zero at the front.
    pub previous_offset: u64,
    /// Offset of the older page.
    pub next_offset: u64,
}

impl PageWindow {
    pub fn new(offset: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        Self {
            offset,
            page_size,
            previous_offset: offset.saturating_sub(page_size),
            next_offset: offset.saturating_add(page_size),
        }
    }

    pub fn is_first(&self) -> bool {
        self.offset == 0
    }
}

/// One rendered page of the main listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<EntryRecord>,
    pub window: PageWindow,
    /// Whether at least one entry exists past this page.
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Page(EntryPage),
    /// The offset points past the data; callers send the client to offset 0.
    RedirectToFirst,
}

impl PageOutcome {
    /// Build the outcome from `page_size + 1` fetched rows.
    pub fn from_rows(mut rows: Vec<EntryRecord>, window: PageWindow) -> Self {
        if rows.is_empty() && window.offset > 0 {
            return PageOutcome::RedirectToFirst;
        }

        let limit = usize::try_from(window.page_size).unwrap_or(usize::MAX);
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        PageOutcome::Page(EntryPage {
            entries: rows,
            window,
            has_more,
        })
    }
}

/// Previous/next entries for a permalink. Absent sides stay `None` so
/// templates can branch on presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    pub previous: Option<EntryRecord>,
    pub next: Option<EntryRecord>,
}

impl From<Neighbors> for Adjacency {
    fn from(neighbors: Neighbors) -> Self {
        Self {
            previous: neighbors.previous,
            next: neighbors.next,
        }
    }
}
