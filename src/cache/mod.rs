//! Recent-entries cache.
//!
//! The cache is reached through the [`CacheClient`] trait so deployments can
//! swap the bounded in-process [`LruCacheClient`] for a networked store
//! without touching the services that read it.
//!
//! ```toml
//! [cache]
//! capacity = 64
//! recent_limit = 5
//! ```

mod client;
mod config;
mod recent;

pub use client::{CacheClient, LruCacheClient};
pub use config::CacheConfig;
pub use recent::{RECENT_ENTRIES_KEY, RecentEntriesCache};
