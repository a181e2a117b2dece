//! Scan result memoization
//!
//! Content-addressed cache of match lists keyed by the query hash. The core
//! treats the cache as best-effort: a failing lookup degrades to a fresh
//! scan and a failing write is only warned about.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use services_common::ChartSegment;
use thiserror::Error;

/// Cache failure modes. `NotFound` is the distinguished miss; anything else
/// is a backend fault the caller may ignore.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry stored under the requested hash
    #[error("scan result not found")]
    NotFound,
    /// The backing store failed
    #[error("cache backend failure: {0}")]
    Backend(String),
}

/// Keyed store of previously computed match lists. Implementations must be
/// safe for concurrent use.
#[async_trait]
pub trait ScanCache: Send + Sync {
    /// Look up the match list stored under `hash`.
    async fn get_scan(&self, hash: &str) -> Result<Vec<ChartSegment>, CacheError>;

    /// Store `matches` under `hash` with an absolute expiry of now + `ttl`.
    async fn set_scan(
        &self,
        hash: &str,
        matches: &[ChartSegment],
        ttl: Duration,
    ) -> Result<(), CacheError>;
}

struct CacheEntry {
    matches: Vec<ChartSegment>,
    expires_at: Instant,
}

/// In-process [`ScanCache`] backed by a concurrent map with absolute
/// per-entry expiry. Expired entries are evicted lazily on lookup. Lookups
/// hand out defensive copies.
#[derive(Default)]
pub struct MemoryScanCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryScanCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ScanCache for MemoryScanCache {
    async fn get_scan(&self, hash: &str) -> Result<Vec<ChartSegment>, CacheError> {
        let expired = match self.entries.get(hash) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(entry.matches.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(hash);
        }
        Err(CacheError::NotFound)
    }

    async fn set_scan(
        &self,
        hash: &str,
        matches: &[ChartSegment],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries.insert(
            hash.to_string(),
            CacheEntry {
                matches: matches.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
