//! Cache tier of the replay registry.
//!
//! A capacity-bounded [`moka::future::Cache`] keyed by JTI. Each entry lives
//! until the assertion it was recorded for expires, with LRU eviction as the
//! bound when capacity is exceeded. Eviction never weakens replay detection:
//! the durable tier is consulted on every validation.

use chrono::{DateTime, Utc};
use moka::{future::Cache, policy::EvictionPolicy};
use std::time::{Duration, Instant};

/// What the cache remembers about the last accepted assertion for a JTI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedAssertion {
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl CachedAssertion {
    /// Remaining lifetime measured against the wall clock.
    fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Evicts each entry when its assertion expires, on create and on overwrite.
struct AssertionExpiry;

impl moka::Expiry<String, CachedAssertion> for AssertionExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedAssertion,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.remaining())
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedAssertion,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.remaining())
    }
}

/// Shared JTI cache. Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct JtiCache {
    entries: Cache<String, CachedAssertion>,
}

impl JtiCache {
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(AssertionExpiry)
            .build();
        Self { entries }
    }

    pub async fn get(&self, jti: &str) -> Option<CachedAssertion> {
        self.entries.get(jti).await
    }

    /// Insert, or overwrite a stale entry.
    pub async fn insert(&self, jti: &str, entry: CachedAssertion) {
        self.entries.insert(jti.to_string(), entry).await;
    }

    pub async fn invalidate(&self, jti: &str) {
        self.entries.invalidate(jti).await;
    }

    /// Apply pending evictions. Lookups already hide expired entries; this
    /// only matters for [`JtiCache::entry_count`].
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}
