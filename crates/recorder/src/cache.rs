// Segment Cache: bounded LRU of segment URIs already queued in the current session.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;

/// Private to one playlist poller, so it is never shared across tasks.
pub struct SegmentCache {
    seen: Cache<String, ()>,
}

impl SegmentCache {
    pub fn new(capacity: u64) -> Self {
        let seen = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { seen }
    }

    /// Records `uri` and returns `true` if it was not present.
    ///
    /// A hit refreshes the entry's recency.
    pub fn insert_if_absent(&self, uri: &str) -> bool {
        if self.seen.get(uri).is_some() {
            return false;
        }
        self.seen.insert(uri.to_owned(), ());
        true
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.seen.contains_key(uri)
    }

    /// Approximate number of entries; exact after pending maintenance has run.
    pub fn len(&self) -> u64 {
        self.seen.run_pending_tasks();
        self.seen.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
