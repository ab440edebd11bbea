//! Cache configuration.

use std::num::NonZeroUsize;

const DEFAULT_CAPACITY: usize = 64;
const DEFAULT_RECENT_LIMIT: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of keys held by the in-process client.
    pub capacity: usize,
    /// Number of entries kept in the recent-entries slot.
    pub recent_limit: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            capacity: settings.capacity.get(),
            recent_limit: settings.recent_limit.get(),
        }
    }
}

impl CacheConfig {
    /// Capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
