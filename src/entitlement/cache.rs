//! Positive-result entitlement cache
//!
//! Only grants are stored: a subject that is not entitled today may be
//! tomorrow, and that must be observed on the next request. Eviction is
//! least-recently-used; lookups refresh recency.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::core::SubjectId;

/// Default number of subjects remembered
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Bounded LRU cache of subjects known to be entitled
pub struct EntitlementCache {
    /// Subject -> when the grant was observed
    entries: Mutex<LruCache<SubjectId, Instant>>,
    /// Optional lifetime of a grant; `None` keeps it until evicted
    ttl: Option<Duration>,
}

impl EntitlementCache {
    /// Create a cache holding at most `capacity` subjects
    pub fn new(capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Create a cache with no grant expiry
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self::new(capacity, None)
    }

    /// Whether `subject` holds a live grant; refreshes its recency
    pub fn is_entitled(&self, subject: SubjectId) -> bool {
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(&subject)
            .map(|granted_at| self.is_fresh(*granted_at));

        match fresh {
            Some(true) => true,
            Some(false) => {
                entries.pop(&subject);
                false
            }
            None => false,
        }
    }

    /// Record a grant for `subject`
    pub fn mark_entitled(&self, subject: SubjectId) {
        self.entries.lock().put(subject, Instant::now());
    }

    /// Whether `subject` is present, without touching recency or expiry
    pub fn contains(&self, subject: SubjectId) -> bool {
        self.entries.lock().contains(&subject)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_fresh(&self, granted_at: Instant) -> bool {
        match self.ttl {
            Some(ttl) => granted_at.elapsed() < ttl,
            None => true,
        }
    }
}

impl Default for EntitlementCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}
