//! Robots.txt caching
//!
//! Parsed rules are kept per host for a bounded time and a bounded number of
//! hosts, so every page of a site reuses one robots.txt fetch.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new CachedRobots stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the entry is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    /// Returns the age of the cached robots.txt
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Bounded, time-limited robots.txt cache keyed by `scheme://host:port`
///
/// Lookups never promote, so a full cache drops the oldest fetch first.
#[derive(Debug)]
pub struct RobotsCache {
    entries: LruCache<String, CachedRobots>,
    ttl: Duration,
}

impl RobotsCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            ttl,
        }
    }

    /// Returns the cached rules for a host if they are still fresh
    ///
    /// Stale entries are dropped on lookup.
    pub fn get(&mut self, host_key: &str) -> Option<ParsedRobots> {
        let stale = self.entries.peek(host_key)?.is_stale(self.ttl);
        if stale {
            tracing::trace!("robots.txt for {} expired", host_key);
            self.entries.pop(host_key);
            return None;
        }
        self.entries.peek(host_key).map(|cached| cached.content.clone())
    }

    pub fn insert(&mut self, host_key: String, robots: ParsedRobots) {
        self.insert_cached(host_key, CachedRobots::new(robots));
    }

    pub fn insert_cached(&mut self, host_key: String, cached: CachedRobots) {
        if let Some(existing) = self.entries.peek_mut(&host_key) {
            *existing = cached;
        } else if let Some((evicted, _)) = self.entries.push(host_key, cached) {
            tracing::trace!("robots cache full, evicted {}", evicted);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
